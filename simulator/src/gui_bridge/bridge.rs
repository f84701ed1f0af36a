use crate::gui_bridge::model::StatusModel;
use anyhow::Context;
use capturecore::device_interface::{
    Abundance, MarkerEvent, OrientationSample, PersistenceSink, SavedRecord, Viewport,
};
use capturecore::processing::{CaptureError, CaptureOutcome};
use capturecore::session::SessionError;
use capturecore::SessionHandle;
use log::{info, warn};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::Filter;

type Reply = WithStatus<Json>;

/// Photo held between the shutter and the operator's label.
#[derive(Default)]
struct Review {
    pending: Option<CaptureOutcome>,
    last_saved: Option<SavedRecord>,
}

/// HTTP front for a running session: producers post events, screens poll status.
pub struct GuiBridge<S> {
    handle: SessionHandle,
    sink: Arc<S>,
    review: Arc<RwLock<Review>>,
}

impl<S> GuiBridge<S>
where
    S: PersistenceSink + 'static,
{
    pub fn new(handle: SessionHandle, sink: S) -> Self {
        Self {
            handle,
            sink: Arc::new(sink),
            review: Arc::new(RwLock::new(Review::default())),
        }
    }

    pub fn routes(&self) -> impl Filter<Extract = (Reply,), Error = warp::Rejection> + Clone {
        let handle = self.handle.clone();
        let with_handle = warp::any().map(move || handle.clone());
        let review = self.review.clone();
        let with_review = warp::any().map(move || review.clone());
        let sink = self.sink.clone();
        let with_sink = warp::any().map(move || sink.clone());

        let snapshot = warp::path!("snapshot")
            .and(warp::get())
            .and(with_handle.clone())
            .and(with_review.clone())
            .and_then(|handle: SessionHandle, review: Arc<RwLock<Review>>| async move {
                let model = status(&handle, &review).await;
                Ok::<_, Infallible>(respond(&model, StatusCode::OK))
            });

        let sample = warp::path!("sample")
            .and(warp::post())
            .and(warp::body::json())
            .and(with_handle.clone())
            .and_then(|sample: OrientationSample, handle: SessionHandle| async move {
                let sent = handle.send_orientation(sample);
                publish(&handle, sent).await
            });

        let marker = warp::path!("marker")
            .and(warp::post())
            .and(warp::body::json())
            .and(with_handle.clone())
            .and_then(|event: MarkerEvent, handle: SessionHandle| async move {
                let sent = handle.send_marker(event);
                publish(&handle, sent).await
            });

        let viewport = warp::path!("viewport")
            .and(warp::post())
            .and(warp::body::json())
            .and(with_handle.clone())
            .and_then(|viewport: Viewport, handle: SessionHandle| async move {
                let sent = handle.send_viewport(viewport);
                publish(&handle, sent).await
            });

        let reset = warp::path!("reset")
            .and(warp::post())
            .and(with_handle.clone())
            .and(with_review.clone())
            .and_then(|handle: SessionHandle, review: Arc<RwLock<Review>>| async move {
                review.write().await.pending = None;
                let sent = handle.reset();
                publish(&handle, sent).await
            });

        let capture = warp::path!("capture")
            .and(warp::post())
            .and(with_handle.clone())
            .and(with_review.clone())
            .and_then(capture_photo);

        let save = warp::path!("save" / Abundance)
            .and(warp::post())
            .and(with_handle)
            .and(with_review)
            .and(with_sink)
            .and_then(save_photo::<S>);

        snapshot
            .or(sample)
            .unify()
            .or(marker)
            .unify()
            .or(viewport)
            .unify()
            .or(reset)
            .unify()
            .or(capture)
            .unify()
            .or(save)
            .unify()
    }

    /// Serves until `shutdown` resolves.
    pub async fn serve(
        &self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .with_context(|| format!("binding bridge to {}", addr))?;
        info!("bridge listening on http://{}", bound);
        server.await;
        Ok(())
    }
}

fn respond<T: Serialize>(body: &T, status: StatusCode) -> Reply {
    warp::reply::with_status(warp::reply::json(body), status)
}

fn session_closed(err: SessionError) -> Reply {
    warn!("bridge request dropped: {}", err);
    respond(
        &json!({ "error": err.to_string() }),
        StatusCode::SERVICE_UNAVAILABLE,
    )
}

fn capture_rejected(err: CaptureError) -> Reply {
    let status = match err {
        CaptureError::NotReady(_) | CaptureError::PhotoPending => StatusCode::CONFLICT,
        CaptureError::SessionClosed => StatusCode::SERVICE_UNAVAILABLE,
        CaptureError::CaptureFailure(_) | CaptureError::PersistenceFailure(_) => {
            StatusCode::BAD_GATEWAY
        }
    };
    warn!("capture rejected: {}", err);
    respond(&json!({ "error": err.to_string() }), status)
}

async fn status(handle: &SessionHandle, review: &RwLock<Review>) -> StatusModel {
    let review = review.read().await;
    StatusModel {
        session: handle.snapshot(),
        metrics: handle.metrics().snapshot(),
        pending: review.pending.as_ref().map(|outcome| outcome.metadata.clone()),
        last_saved: review.last_saved.clone(),
    }
}

/// Replies with the snapshot published once the queued event has been handled.
async fn publish(handle: &SessionHandle, sent: Result<(), SessionError>) -> Result<Reply, Infallible> {
    let flushed = match sent {
        Ok(()) => handle.flush().await,
        Err(err) => Err(err),
    };
    Ok(match flushed {
        Ok(snapshot) => respond(&snapshot, StatusCode::OK),
        Err(err) => session_closed(err),
    })
}

async fn capture_photo(
    handle: SessionHandle,
    review: Arc<RwLock<Review>>,
) -> Result<Reply, Infallible> {
    Ok(match handle.capture().await {
        Ok(outcome) => {
            let reply = respond(&outcome.metadata, StatusCode::CREATED);
            review.write().await.pending = Some(outcome);
            reply
        }
        Err(err) => capture_rejected(err),
    })
}

async fn save_photo<S: PersistenceSink>(
    label: Abundance,
    handle: SessionHandle,
    review: Arc<RwLock<Review>>,
    sink: Arc<S>,
) -> Result<Reply, Infallible> {
    let Some(outcome) = review.write().await.pending.take() else {
        return Ok(respond(
            &json!({ "error": "no photo is awaiting a label" }),
            StatusCode::CONFLICT,
        ));
    };

    match sink.save(&outcome.photo, &outcome.metadata, label).await {
        Ok(record) => {
            info!("labelled capture {} saved to {}", label, record.location);
            review.write().await.last_saved = Some(record.clone());
            if let Err(err) = handle.reset() {
                return Ok(session_closed(err));
            }
            Ok(respond(&record, StatusCode::CREATED))
        }
        Err(err) => {
            // Keep the photo so the operator can retry the save.
            review.write().await.pending = Some(outcome);
            Ok(capture_rejected(CaptureError::PersistenceFailure(err.to_string())))
        }
    }
}
