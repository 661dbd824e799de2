//! Live control panel for the referee.
//!
//! Serves a threshold slider, the latest difference image and a quit button.
//! The panel and the game loop share state only through `watch` channels:
//! the panel owns the senders for threshold and quit, the loop owns the
//! sender for the difference image.

use std::io::Cursor;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use image::{GrayImage, ImageFormat};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Panel side of the control channel.
pub struct ControlPanel {
    threshold: watch::Sender<u8>,
    quit: watch::Sender<bool>,
    diff: watch::Receiver<Option<Arc<GrayImage>>>,
}

/// Game-loop side of the control channel.
pub struct GameLink {
    threshold: watch::Receiver<u8>,
    quit: watch::Receiver<bool>,
    diff: watch::Sender<Option<Arc<GrayImage>>>,
}

pub fn control_channel(initial_threshold: u8) -> (ControlPanel, GameLink) {
    let (threshold_tx, threshold_rx) = watch::channel(initial_threshold);
    let (quit_tx, quit_rx) = watch::channel(false);
    let (diff_tx, diff_rx) = watch::channel(None);
    (
        ControlPanel {
            threshold: threshold_tx,
            quit: quit_tx,
            diff: diff_rx,
        },
        GameLink {
            threshold: threshold_rx,
            quit: quit_rx,
            diff: diff_tx,
        },
    )
}

impl ControlPanel {
    pub fn threshold(&self) -> u8 {
        *self.threshold.borrow()
    }

    pub fn set_threshold(&self, value: u8) {
        self.threshold.send_replace(value);
    }

    pub fn request_quit(&self) {
        self.quit.send_replace(true);
    }

    pub fn latest_diff(&self) -> Option<Arc<GrayImage>> {
        self.diff.borrow().clone()
    }
}

impl GameLink {
    /// Threshold to use for the next comparison.
    pub fn threshold(&self) -> u8 {
        *self.threshold.borrow()
    }

    pub fn quit_requested(&self) -> bool {
        *self.quit.borrow()
    }

    /// Resolves once quit has been requested. Never resolves if the panel is gone.
    pub async fn wait_for_quit(&mut self) {
        if self.quit.wait_for(|quit| *quit).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    pub fn publish_diff(&self, image: GrayImage) {
        self.diff.send_replace(Some(Arc::new(image)));
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct ThresholdBody {
    threshold: u8,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><title>Red Light, Green Light</title></head>
<body>
<h1>Diff</h1>
<label>thresh <input id="thresh" type="range" min="0" max="255"></label>
<output id="value"></output>
<button id="quit">Quit</button>
<br><img id="diff" src="/diff.png" alt="no difference image yet">
<script>
const slider = document.getElementById('thresh');
const value = document.getElementById('value');
fetch('/threshold').then(r => r.json()).then(b => { slider.value = b.threshold; value.textContent = b.threshold; });
slider.addEventListener('input', () => {
  value.textContent = slider.value;
  fetch('/threshold', { method: 'PUT', headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ threshold: Number(slider.value) }) });
});
document.getElementById('quit').addEventListener('click', () => fetch('/quit', { method: 'POST' }));
setInterval(() => { document.getElementById('diff').src = '/diff.png?t=' + Date.now(); }, 100);
</script>
</body>
</html>
"#;

/// GET /
async fn index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

/// GET /threshold
async fn get_threshold(State(panel): State<Arc<ControlPanel>>) -> impl IntoResponse {
    Json(ThresholdBody {
        threshold: panel.threshold(),
    })
}

/// PUT /threshold, body { "threshold": 0..=255 }
async fn put_threshold(
    State(panel): State<Arc<ControlPanel>>,
    Json(body): Json<ThresholdBody>,
) -> impl IntoResponse {
    panel.set_threshold(body.threshold);
    info!(threshold = body.threshold, "threshold updated");
    Json(body)
}

/// GET /diff.png: latest binarized difference image
async fn diff_png(State(panel): State<Arc<ControlPanel>>) -> impl IntoResponse {
    let Some(image) = panel.latest_diff() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let mut png = Cursor::new(Vec::new());
    match image.write_to(&mut png, ImageFormat::Png) {
        Ok(()) => ([(header::CONTENT_TYPE, "image/png")], png.into_inner()).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode difference image");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// POST /quit
async fn quit(State(panel): State<Arc<ControlPanel>>) -> impl IntoResponse {
    info!("quit requested from control panel");
    panel.request_quit();
    StatusCode::ACCEPTED
}

pub fn router(panel: Arc<ControlPanel>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/threshold", get(get_threshold).put(put_threshold))
        .route("/diff.png", get(diff_png))
        .route("/quit", post(quit))
        .layer(TraceLayer::new_for_http())
        .with_state(panel)
}

pub async fn serve(panel: Arc<ControlPanel>, bind: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = bind, "control panel listening");
    axum::serve(listener, router(panel)).await
}
