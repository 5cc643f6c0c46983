//! Upload form page

use axum::{
    response::{Html, IntoResponse},
    routing::get,
    Router,
};

use crate::AppState;

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new().route("/", get(upload_form))
}

/// GET /
///
/// Study name plus multi-file picker, posting to `/upload`
pub async fn upload_form() -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    let git_hash = env!("GIT_HASH");

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>dicomvault - Upload</title>
    <style>
        body {{
            font-family: system-ui, -apple-system, sans-serif;
            max-width: 640px;
            margin: 40px auto;
            padding: 20px;
            line-height: 1.6;
        }}
        h1 {{
            color: #333;
            border-bottom: 2px solid #0066cc;
            padding-bottom: 10px;
        }}
        label {{
            display: block;
            margin-top: 12px;
        }}
        input[type=submit] {{
            margin-top: 16px;
            padding: 8px 20px;
            background: #0066cc;
            color: white;
            border: none;
            border-radius: 4px;
        }}
    </style>
</head>
<body>
    <h1>Upload DICOM files</h1>
    <form method="post" enctype="multipart/form-data" action="/upload">
        <label for="study">Study</label>
        <input type="text" id="study" name="study" placeholder="e.g. iraj-2025-xray" required>
        <label for="files">Files</label>
        <input type="file" id="files" name="files" multiple required>
        <input type="submit" value="Upload">
    </form>
    <p><small>dicomvault v{version} [{git_hash}]</small></p>
</body>
</html>
"#
    ))
}
