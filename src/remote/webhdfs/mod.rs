//! WebHDFS backend.
//!
//! Speaks the HTTP REST interface of the namenode at `/webhdfs/v1`. Data
//! operations (`CREATE`, `OPEN`) are two-step: the namenode answers with a
//! redirect to a datanode, which then receives or serves the bytes.

mod types;

use reqwest::{header::LOCATION, redirect::Policy, Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::{fs::File, io::AsyncWriteExt};

use self::types::{
    remote_error, BooleanResponse, ContentSummaryResponse, FileStatusResponse, ListStatusResponse,
};
use super::{ClientConfig, ContentSummary, FileStatus, RemoteFs};
use crate::{
    error::{Error, Result},
    path::RemotePath,
};

const API_PREFIX: &str = "webhdfs/v1";

pub struct WebHdfs {
    address: String,
    endpoint: Url,
    user: Option<String>,
    client: Client,
}

impl WebHdfs {
    /// Creates a client for `webhdfs://`, `swebhdfs://`, `http://` or
    /// `https://` addresses. No request is sent yet.
    pub fn new(address: &str, config: &ClientConfig) -> Result<Self> {
        let endpoint = endpoint(address)?;
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Connection {
                address: address.to_owned(),
                reason: e.to_string(),
            })?;

        debug!("WebHDFS endpoint for {address} is {endpoint}");

        Ok(Self {
            address: address.to_owned(),
            endpoint,
            user: config.user.clone(),
            client,
        })
    }

    fn url(&self, path: &RemotePath, op: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::Protocol(format!("{} cannot carry a path", self.endpoint)))?;
            let _ = segments.pop_if_empty();
            if path.is_root() {
                let _ = segments.push("");
            } else {
                let _ = segments.extend(path.segments());
            }
        }

        {
            let mut query = url.query_pairs_mut();
            let _ = query.append_pair("op", op);
            for (key, value) in params {
                let _ = query.append_pair(key, value);
            }
            if let Some(user) = &self.user {
                let _ = query.append_pair("user.name", user);
            }
        }

        Ok(url)
    }

    /// Sends a request and turns error statuses into typed errors.
    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() || status.is_redirection() {
            return Ok(response);
        }

        let body = response.bytes().await?;
        Err(remote_error(status.as_u16(), &body))
    }

    async fn json<T: DeserializeOwned>(&self, method: Method, url: Url) -> Result<T> {
        trace!("{method} {url}");
        let response = Self::send(self.client.request(method, url)).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// First step of a data operation: the namenode names the datanode.
    async fn redirect(&self, method: Method, url: Url) -> Result<Url> {
        trace!("{method} {url}");
        let response = Self::send(self.client.request(method, url)).await?;
        if !response.status().is_redirection() {
            return Err(Error::Protocol(format!(
                "Expected a datanode redirect, got {}",
                response.status()
            )));
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::Protocol("Redirect without location".to_owned()))?;

        Url::parse(location).map_err(|e| Error::Protocol(format!("Bad redirect {location}: {e}")))
    }
}

/// Maps a base address onto the REST endpoint of its namenode.
fn endpoint(address: &str) -> Result<Url> {
    let (scheme, rest) = address
        .split_once("://")
        .ok_or_else(|| Error::UnsupportedScheme(address.to_owned()))?;

    let http_scheme = match scheme.to_ascii_lowercase().as_str() {
        "webhdfs" | "http" => "http",
        "swebhdfs" | "https" => "https",
        _ => return Err(Error::UnsupportedScheme(address.to_owned())),
    };

    let authority = rest.split_once('/').map_or(rest, |(authority, _)| authority);
    if authority.is_empty() {
        return Err(Error::Connection {
            address: address.to_owned(),
            reason: "missing namenode host".to_owned(),
        });
    }

    Url::parse(&format!("{http_scheme}://{authority}/{API_PREFIX}")).map_err(|e| {
        Error::Connection {
            address: address.to_owned(),
            reason: e.to_string(),
        }
    })
}

#[async_trait]
impl RemoteFs for WebHdfs {
    fn base_address(&self) -> &str {
        &self.address
    }

    async fn status(&self, path: &RemotePath) -> Result<Option<FileStatus>> {
        let url = self.url(path, "GETFILESTATUS", &[])?;
        match self.json::<FileStatusResponse>(Method::GET, url).await {
            Ok(response) => response.file_status.into_status(path).map(Some),
            Err(Error::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn mkdirs(&self, path: &RemotePath) -> Result<bool> {
        let url = self.url(path, "MKDIRS", &[])?;
        let response: BooleanResponse = self.json(Method::PUT, url).await?;
        Ok(response.boolean)
    }

    async fn copy_from_local(&self, overwrite: bool, src: &Path, dst: &RemotePath) -> Result<()> {
        let data = tokio::fs::read(src).await?;
        let overwrite = if overwrite { "true" } else { "false" };

        let url = self.url(dst, "CREATE", &[("overwrite", overwrite)])?;
        let datanode = self.redirect(Method::PUT, url).await?;

        trace!("PUT {datanode} ({} bytes)", data.len());
        let request = self
            .client
            .put(datanode)
            .header("Content-Type", "application/octet-stream")
            .body(data);
        let _ = Self::send(request).await?;
        Ok(())
    }

    async fn copy_to_local(&self, src: &RemotePath, dst: &Path) -> Result<()> {
        let url = self.url(src, "OPEN", &[])?;
        let datanode = self.redirect(Method::GET, url).await?;

        trace!("GET {datanode}");
        let mut response = Self::send(self.client.get(datanode)).await?;
        let mut file = File::create(dst).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }

    async fn delete(&self, path: &RemotePath, recursive: bool) -> Result<bool> {
        let recursive = if recursive { "true" } else { "false" };
        let url = self.url(path, "DELETE", &[("recursive", recursive)])?;
        let response: BooleanResponse = self.json(Method::DELETE, url).await?;
        Ok(response.boolean)
    }

    async fn list_status(&self, path: &RemotePath) -> Result<Vec<FileStatus>> {
        let url = self.url(path, "LISTSTATUS", &[])?;
        let response: ListStatusResponse = self.json(Method::GET, url).await?;
        response
            .file_statuses
            .file_status
            .into_iter()
            .map(|raw| raw.into_status(path))
            .collect()
    }

    async fn content_summary(&self, path: &RemotePath) -> Result<ContentSummary> {
        let url = self.url(path, "GETCONTENTSUMMARY", &[])?;
        let response: ContentSummaryResponse = self.json(Method::GET, url).await?;
        Ok(response.content_summary.into())
    }

    async fn close(&self) -> Result<()> {
        debug!("WebHDFS client for {} released", self.address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::{
        io::AsyncReadExt,
        net::{TcpListener, TcpStream},
    };

    const NOT_FOUND: &[u8] = br#"{"RemoteException":{"exception":"FileNotFoundException",
        "javaClassName":"java.io.FileNotFoundException","message":"File does not exist: /missing"}}"#;

    /// One request as seen by [`Namenode`].
    #[derive(Debug, Clone)]
    struct Request {
        method: String,
        path: String,
        query: String,
        body: Vec<u8>,
    }

    impl Request {
        fn op(&self) -> Option<&str> {
            self.query
                .split('&')
                .find_map(|pair| pair.strip_prefix("op="))
        }
    }

    /// Minimal HTTP/1.1 server standing in for a namenode and its datanode.
    /// Each connection serves one request and is then closed.
    struct Namenode {
        address: String,
        requests: Arc<Mutex<Vec<Request>>>,
    }

    impl Namenode {
        async fn start<F>(handler: F) -> Self
        where
            F: Fn(&Request, &str) -> Vec<u8> + Send + Sync + 'static,
        {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let origin = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));

            let seen = Arc::clone(&requests);
            let base = origin.clone();
            drop(tokio::spawn(async move {
                while let Ok((mut stream, _)) = listener.accept().await {
                    let Ok(request) = read_request(&mut stream).await else {
                        continue;
                    };
                    let reply = handler(&request, &base);
                    seen.lock().unwrap().push(request);
                    let _ = stream.write_all(&reply).await;
                    let _ = stream.shutdown().await;
                }
            }));

            Self {
                address: origin.replacen("http", "webhdfs", 1),
                requests,
            }
        }

        fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn read_request(stream: &mut TcpStream) -> std::io::Result<Request> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let head_end = loop {
            if let Some(pos) = buf.windows(4).position(|window| window == b"\r\n\r\n") {
                break pos + 4;
            }
            let read = stream.read(&mut chunk).await?;
            if read == 0 {
                return Err(std::io::ErrorKind::UnexpectedEof.into());
            }
            buf.extend_from_slice(&chunk[..read]);
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
        let mut lines = head.lines();
        let mut request_line = lines.next().unwrap_or_default().split(' ');
        let method = request_line.next().unwrap_or_default().to_owned();
        let target = request_line.next().unwrap_or_default();
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let length: usize = lines
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse().ok())
            .unwrap_or(0);

        let mut body = buf[head_end..].to_vec();
        while body.len() < length {
            let read = stream.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..read]);
        }

        Ok(Request {
            method,
            path: path.to_owned(),
            query: query.to_owned(),
            body,
        })
    }

    fn reply(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
        let mut out = format!("HTTP/1.1 {status}\r\n");
        for (name, value) in headers {
            out.push_str(&format!("{name}: {value}\r\n"));
        }
        out.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        ));
        let mut out = out.into_bytes();
        out.extend_from_slice(body);
        out
    }

    fn client(address: &str, user: Option<&str>) -> WebHdfs {
        let config = ClientConfig {
            user: user.map(str::to_owned),
            ..ClientConfig::default()
        };
        WebHdfs::new(address, &config).unwrap()
    }

    #[test]
    fn maps_schemes_onto_http() {
        assert_eq!(
            endpoint("webhdfs://namenode:9870").unwrap().as_str(),
            "http://namenode:9870/webhdfs/v1"
        );
        assert_eq!(
            endpoint("swebhdfs://namenode:9871/ignored/path").unwrap().as_str(),
            "https://namenode:9871/webhdfs/v1"
        );
        assert!(matches!(
            endpoint("hdfs://namenode:9000"),
            Err(Error::UnsupportedScheme(_))
        ));
        assert!(endpoint("webhdfs://").is_err());
    }

    #[test]
    fn builds_operation_urls() {
        let fs = client("webhdfs://nn:9870", Some("student"));
        let path = RemotePath::parse("/user/student/my file.txt").unwrap();
        let url = fs.url(&path, "DELETE", &[("recursive", "true")]).unwrap();

        assert_eq!(
            url.as_str(),
            "http://nn:9870/webhdfs/v1/user/student/my%20file.txt?op=DELETE&recursive=true&user.name=student"
        );
    }

    #[test]
    fn root_keeps_trailing_slash() {
        let fs = client("http://nn:9870", None);
        let url = fs.url(&RemotePath::root(), "GETFILESTATUS", &[]).unwrap();
        assert_eq!(url.as_str(), "http://nn:9870/webhdfs/v1/?op=GETFILESTATUS");
    }

    #[tokio::test]
    async fn data_operations_follow_the_datanode_redirect() {
        let stored = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&stored);
        let server = Namenode::start(move |request, origin| {
            if let Some(file) = request.path.strip_prefix("/datanode") {
                return match request.method.as_str() {
                    "PUT" => {
                        *store.lock().unwrap() = request.body.clone();
                        let location = format!("webhdfs://nn{file}");
                        reply("201 Created", &[("Location", location.as_str())], b"")
                    }
                    _ => reply("200 OK", &[], &store.lock().unwrap()),
                };
            }

            let location = format!("{origin}/datanode{}?{}", request.path, request.query);
            reply("307 Temporary Redirect", &[("Location", location.as_str())], b"")
        })
        .await;

        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("upload.bin");
        let content: Vec<u8> = (0..300_000u32)
            .map(|i| u8::try_from(i % 251).unwrap())
            .collect();
        std::fs::write(&upload, &content).unwrap();

        let fs = client(&server.address, Some("student"));
        let remote = RemotePath::parse("/user/student/data.bin").unwrap();
        fs.copy_from_local(true, &upload, &remote).await.unwrap();

        let download = dir.path().join("download.bin");
        fs.copy_to_local(&remote, &download).await.unwrap();
        assert_eq!(std::fs::read(&download).unwrap(), content);

        let requests = server.requests();
        let steps: Vec<_> = requests
            .iter()
            .map(|request| (request.method.as_str(), request.path.as_str(), request.op()))
            .collect();
        assert_eq!(
            steps,
            [
                ("PUT", "/webhdfs/v1/user/student/data.bin", Some("CREATE")),
                ("PUT", "/datanode/webhdfs/v1/user/student/data.bin", Some("CREATE")),
                ("GET", "/webhdfs/v1/user/student/data.bin", Some("OPEN")),
                ("GET", "/datanode/webhdfs/v1/user/student/data.bin", Some("OPEN")),
            ]
        );
        assert!(requests[0].query.contains("overwrite=true"));
        assert!(requests[0].query.contains("user.name=student"));
        assert!(requests[0].body.is_empty());
        assert_eq!(requests[1].body.len(), content.len());
    }

    #[tokio::test]
    async fn data_operations_require_a_redirect_with_location() {
        let server = Namenode::start(|request, _| match request.op() {
            Some("OPEN") => reply("307 Temporary Redirect", &[], b""),
            _ => reply("200 OK", &[("Content-Type", "application/json")], b"{}"),
        })
        .await;

        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("upload.txt");
        std::fs::write(&upload, b"data").unwrap();
        let fs = client(&server.address, None);
        let remote = RemotePath::parse("/data.txt").unwrap();

        match fs.copy_from_local(false, &upload, &remote).await {
            Err(Error::Protocol(message)) => {
                assert!(message.starts_with("Expected a datanode redirect"), "{message}");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let target = dir.path().join("download.txt");
        match fs.copy_to_local(&remote, &target).await {
            Err(Error::Protocol(message)) => assert_eq!(message, "Redirect without location"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn missing_paths_are_reported_as_absent() {
        let server = Namenode::start(|_, _| {
            reply("404 Not Found", &[("Content-Type", "application/json")], NOT_FOUND)
        })
        .await;

        let fs = client(&server.address, None);
        let missing = RemotePath::parse("/missing").unwrap();
        assert!(fs.status(&missing).await.unwrap().is_none());
        assert!(!fs.exists(&missing).await.unwrap());
        assert!(matches!(
            fs.list_status(&missing).await,
            Err(Error::NotFound(message)) if message == "File does not exist: /missing"
        ));

        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].op(), Some("GETFILESTATUS"));
        assert_eq!(requests[2].op(), Some("LISTSTATUS"));
    }
}
