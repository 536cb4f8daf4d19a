use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use opa_config::OpaConfig;
use opa_primitives::{RestRequest, RestReturn, TransportError};

use crate::client::OpaClient;
use crate::transport::{RestTransport, TransportResult};

/// Transport that records requests and answers from a scripted queue.
#[derive(Clone, Default)]
pub(crate) struct RecordingTransport {
    requests: Arc<Mutex<Vec<RestRequest>>>,
    replies: Arc<Mutex<VecDeque<TransportResult<RestReturn>>>>,
}

impl RecordingTransport {
    pub(crate) fn replying<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = TransportResult<RestReturn>>,
    {
        Self {
            requests: Arc::default(),
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
        }
    }

    pub(crate) fn push_reply(&self, reply: TransportResult<RestReturn>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub(crate) fn requests(&self) -> Vec<RestRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn single_request(&self) -> RestRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests.into_iter().next().unwrap()
    }

    pub(crate) fn last_request(&self) -> RestRequest {
        self.requests().pop().expect("at least one request")
    }
}

#[async_trait]
impl RestTransport for RecordingTransport {
    async fn send(&self, request: RestRequest) -> TransportResult<RestReturn> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::protocol("no scripted reply")))
    }
}

pub(crate) fn client_with(transport: &RecordingTransport) -> OpaClient {
    OpaClient::with_transport(OpaConfig::default(), Arc::new(transport.clone()))
}
