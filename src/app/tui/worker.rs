use std::sync::mpsc;
use std::thread;

use tracing::debug;

use crate::api::{ApiError, ContentApi};
use crate::player::Episode;

#[derive(Debug, Clone)]
pub(super) enum ListingRequest {
    Latest { limit: usize, refresh: bool },
    Detail { id: String },
}

#[derive(Debug)]
pub(crate) enum ListingResult {
    Latest(Result<Vec<Episode>, String>),
    Detail {
        id: String,
        outcome: Result<Episode, ApiError>,
    },
}

/// Owns the API client on a background thread so fetches never block
/// the draw loop.
pub(super) struct ListingWorker {
    requests: mpsc::Sender<ListingRequest>,
    results: mpsc::Receiver<ListingResult>,
}

impl ListingWorker {
    pub(super) fn spawn(api: ContentApi) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<ListingRequest>();
        let (result_tx, result_rx) = mpsc::channel::<ListingResult>();

        thread::spawn(move || {
            for request in request_rx {
                debug!(?request, "listing request");
                let result = match request {
                    ListingRequest::Latest { limit, refresh } => ListingResult::Latest(
                        api.fetch_latest(limit, refresh)
                            .map_err(|err| err.to_string()),
                    ),
                    ListingRequest::Detail { id } => {
                        let outcome = api.fetch_episode(&id);
                        ListingResult::Detail { id, outcome }
                    }
                };
                if result_tx.send(result).is_err() {
                    break;
                }
            }
        });

        Self {
            requests: request_tx,
            results: result_rx,
        }
    }

    pub(super) fn request(&self, request: ListingRequest) {
        let _ = self.requests.send(request);
    }

    pub(super) fn try_recv(&self) -> Option<ListingResult> {
        self.results.try_recv().ok()
    }
}
