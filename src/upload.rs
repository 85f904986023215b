use log::{info, warn};

use crate::http::{HttpTransport, Method, DETAILS_HEADER, HTTP_OK};

/// Total POST attempts for a file, the first one included
pub const MAX_FILE_UPLOAD_ATTEMPTS: u32 = 10;

/// Sends the encoded record as the `M5-Details` header of a single GET.
///
/// Only a 200 counts as uploaded. There is no retry, a failed tick is simply
/// dropped.
pub fn upload_details<T: HttpTransport>(transport: &mut T, url: &str, details: &str) -> bool {
    let headers = [(DETAILS_HEADER, details)];
    match transport.request(url, &headers, Method::Get, None) {
        Ok(status) => {
            info!("HTTP code: {}", status);
            status == HTTP_OK
        }
        Err(e) => {
            warn!("Upload failed: {}", e);
            false
        }
    }
}

/// POSTs a stored file's bytes, retrying back to back until a 200 or
/// [`MAX_FILE_UPLOAD_ATTEMPTS`] attempts have been made.
pub fn upload_file<T: HttpTransport>(
    transport: &mut T,
    url: &str,
    file_path: &str,
    contents: &[u8],
    details: &str,
) -> bool {
    let filename = file_path.rsplit('/').next().unwrap_or(file_path);
    let disposition = format!("attachment; filename={}", filename);
    let headers = [
        ("Content-Type", "text/plain"),
        ("Content-Disposition", disposition.as_str()),
        (DETAILS_HEADER, details),
    ];

    let mut post = || match transport.request(url, &headers, Method::Post, Some(contents)) {
        Ok(status) => {
            info!("HTTP POST code: {}", status);
            Some(status)
        }
        Err(e) => {
            warn!("HTTP POST of {} failed: {}", file_path, e);
            None
        }
    };

    let mut attempts = 1;
    let mut status = post();
    while status != Some(HTTP_OK) && attempts < MAX_FILE_UPLOAD_ATTEMPTS {
        attempts += 1;
        status = post();
    }

    if status != Some(HTTP_OK) {
        warn!("Giving up on {} after {} attempts", file_path, attempts);
    }
    status == Some(HTTP_OK)
}
