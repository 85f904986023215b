use core::fmt::Debug;
use core::marker::PhantomData;
use std::time::Duration;

use embedded_svc::http::client::{Client, Connection};
use embedded_svc::io::Write;
use log::debug;

pub use embedded_svc::http::Method;

use crate::error::{Result, StationError};

/// Header carrying the encoded upload record
pub const DETAILS_HEADER: &str = "M5-Details";

/// The only status counted as success anywhere in the station
pub const HTTP_OK: u16 = 200;

const READ_CHUNK: usize = 256;

/// Blocking HTTP, one request in flight at a time.
///
/// `Err(StationError::Transport)` means no status was received at all.
pub trait HttpTransport {
    fn request(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
        method: Method,
        body: Option<&[u8]>,
    ) -> Result<u16>;

    /// GET returning the status together with the whole body
    fn get_body(&mut self, url: &str) -> Result<(u16, String)>;
}

fn transport_error<E: Debug>(e: E) -> StationError {
    StationError::Transport(format!("{:?}", e))
}

/// Runs requests over `embedded-svc` connections, opening a fresh one for
/// every request. `connect` receives the configured timeout so the platform
/// connection (`EspHttpConnection` on the board) can apply it.
pub struct ConnectionTransport<C, E, F> {
    connect: F,
    timeout: Duration,
    _connection: PhantomData<fn() -> (C, E)>,
}

impl<C, E, F> ConnectionTransport<C, E, F>
where
    C: Connection,
    E: Debug,
    F: FnMut(Duration) -> core::result::Result<C, E>,
{
    pub fn new(connect: F, timeout: Duration) -> Self {
        Self {
            connect,
            timeout,
            _connection: PhantomData,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn client(&mut self) -> Result<Client<C>> {
        let connection = (self.connect)(self.timeout).map_err(transport_error)?;
        Ok(Client::wrap(connection))
    }
}

impl<C, E, F> HttpTransport for ConnectionTransport<C, E, F>
where
    C: Connection,
    E: Debug,
    F: FnMut(Duration) -> core::result::Result<C, E>,
{
    fn request(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
        method: Method,
        body: Option<&[u8]>,
    ) -> Result<u16> {
        debug!("HTTP {:?} {}", method, url);
        let mut client = self.client()?;

        let content_length = body.map(|body| body.len().to_string());
        let mut all_headers = headers.to_vec();
        if let Some(length) = content_length.as_deref() {
            all_headers.push(("Content-Length", length));
        }

        let mut request = client
            .request(method, url, &all_headers)
            .map_err(transport_error)?;
        if let Some(body) = body {
            request.write_all(body).map_err(transport_error)?;
            request.flush().map_err(transport_error)?;
        }
        let response = request.submit().map_err(transport_error)?;

        let status = response.status();
        debug!("HTTP {} -> {}", url, status);
        Ok(status)
    }

    fn get_body(&mut self, url: &str) -> Result<(u16, String)> {
        let mut client = self.client()?;
        let request = client.get(url).map_err(transport_error)?;
        let mut response = request.submit().map_err(transport_error)?;
        let status = response.status();

        let mut body = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let read = response.read(&mut chunk).map_err(transport_error)?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..read]);
        }

        debug!("HTTP GET {} -> {} ({} bytes)", url, status, body.len());
        Ok((status, String::from_utf8_lossy(&body).into_owned()))
    }
}
