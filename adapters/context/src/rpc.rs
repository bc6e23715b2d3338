//! Request/response calls carried inside context updates.
//!
//! Each side batches its outgoing requests and responses into one JSON array
//! per update. Requests are answered in the batch after they arrive; failed
//! calls come back as error responses rather than being dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::RpcError;

type Handler<H> = Box<dyn Fn(&mut H, Value) -> Result<Value, RpcError> + Send + Sync>;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum RpcMessage {
    Request {
        id: u64,
        method: String,
        #[serde(default)]
        arguments: Value,
    },
    Response {
        id: u64,
        #[serde(default)]
        result: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<RpcError>,
    },
}

/// Ticket for the answer to a call made with
/// [`JsonRpc::invoke_remote`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RpcHandle {
    id: u64,
}

/// One end of a call channel whose handlers act on an `H`.
pub struct JsonRpc<H> {
    handlers: BTreeMap<String, Handler<H>>,
    next_id: u64,
    outgoing: Vec<RpcMessage>,
    pending: BTreeMap<u64, Option<Result<Value, RpcError>>>,
}

impl<H> Default for JsonRpc<H> {
    fn default() -> Self {
        Self {
            handlers: BTreeMap::new(),
            next_id: 1,
            outgoing: Vec::new(),
            pending: BTreeMap::new(),
        }
    }
}

impl<H> std::fmt::Debug for JsonRpc<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpc")
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .field("outgoing", &self.outgoing.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<H> JsonRpc<H> {
    /// Channel with no methods.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers calls to `method` with `handler`, replacing any previous one.
    pub fn register(
        &mut self,
        method: impl Into<String>,
        handler: impl Fn(&mut H, Value) -> Result<Value, RpcError> + Send + Sync + 'static,
    ) {
        let _ = self.handlers.insert(method.into(), Box::new(handler));
    }

    /// Reports whether `method` has a handler.
    #[must_use]
    pub fn handles(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Queues a call to the peer's `method`.
    pub fn invoke_remote(&mut self, method: impl Into<String>, arguments: Value) -> RpcHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.outgoing.push(RpcMessage::Request {
            id,
            method: method.into(),
            arguments,
        });
        let _ = self.pending.insert(id, None);
        RpcHandle { id }
    }

    /// Takes the answer to `handle` once it has arrived.
    pub fn response(&mut self, handle: &RpcHandle) -> Option<Result<Value, RpcError>> {
        match self.pending.get(&handle.id) {
            Some(Some(_)) => self.pending.remove(&handle.id).flatten(),
            _ => None,
        }
    }

    /// Reports whether the answer to `handle` has arrived and not been taken.
    #[must_use]
    pub fn is_finished(&self, handle: &RpcHandle) -> bool {
        matches!(self.pending.get(&handle.id), Some(Some(_)))
    }

    /// Calls still waiting for an answer.
    #[must_use]
    pub fn awaiting_count(&self) -> usize {
        self.pending.values().filter(|answer| answer.is_none()).count()
    }

    /// Drains queued requests and responses into one batch; empty when
    /// nothing is queued.
    pub fn send(&mut self) -> Vec<u8> {
        if self.outgoing.is_empty() {
            return Vec::new();
        }
        let batch = std::mem::take(&mut self.outgoing);
        match serde_json::to_vec(&batch) {
            Ok(bytes) => bytes,
            Err(error) => {
                log::warn!("dropping {} rpc messages: {error}", batch.len());
                Vec::new()
            }
        }
    }

    /// Handles a batch from the peer: requests run against `target` and
    /// queue their answers, responses complete pending handles.
    pub fn receive(&mut self, bytes: &[u8], target: &mut H) -> Result<(), RpcError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let batch: Vec<RpcMessage> = serde_json::from_slice(bytes).map_err(|error| {
            log::warn!("discarding malformed rpc batch: {error}");
            RpcError::Malformed(error.to_string())
        })?;
        for message in batch {
            match message {
                RpcMessage::Request {
                    id,
                    method,
                    arguments,
                } => {
                    let outcome = match self.handlers.get(&method) {
                        Some(handler) => handler(target, arguments),
                        None => Err(RpcError::UnknownMethod(method)),
                    };
                    let (result, error) = match outcome {
                        Ok(result) => (result, None),
                        Err(error) => {
                            log::warn!("rpc request {id} failed: {error}");
                            (Value::Null, Some(error))
                        }
                    };
                    self.outgoing.push(RpcMessage::Response { id, result, error });
                }
                RpcMessage::Response { id, result, error } => match self.pending.get_mut(&id) {
                    Some(slot) if slot.is_none() => {
                        *slot = Some(match error {
                            Some(error) => Err(error),
                            None => Ok(result),
                        });
                    }
                    _ => log::warn!("ignoring rpc response {id} with no matching call"),
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct Counter {
        total: i64,
    }

    fn counter_rpc() -> JsonRpc<Counter> {
        let mut rpc = JsonRpc::new();
        rpc.register("counter.add", |counter: &mut Counter, arguments: Value| {
            let amount = arguments
                .as_i64()
                .ok_or_else(|| RpcError::Malformed(format!("expected an integer, got {arguments}")))?;
            counter.total += amount;
            Ok(json!(counter.total))
        });
        rpc
    }

    #[test]
    fn calls_round_trip_between_peers() {
        let mut server = counter_rpc();
        let mut counter = Counter::default();
        let mut client: JsonRpc<()> = JsonRpc::new();

        let first = client.invoke_remote("counter.add", json!(5));
        let second = client.invoke_remote("counter.add", json!(2));
        assert!(client.response(&first).is_none());

        server.receive(&client.send(), &mut counter).expect("valid batch");
        client.receive(&server.send(), &mut ()).expect("valid batch");

        assert!(client.is_finished(&second));
        assert_eq!(client.response(&first), Some(Ok(json!(5))));
        assert_eq!(client.response(&second), Some(Ok(json!(7))));
        assert_eq!(client.response(&second), None);
        assert_eq!(client.awaiting_count(), 0);
    }

    #[test]
    fn failures_come_back_as_error_responses() {
        let mut server = counter_rpc();
        let mut counter = Counter::default();
        let mut client: JsonRpc<()> = JsonRpc::new();

        let unknown = client.invoke_remote("counter.reset", Value::Null);
        let malformed = client.invoke_remote("counter.add", json!("lots"));
        server.receive(&client.send(), &mut counter).expect("valid batch");
        client.receive(&server.send(), &mut ()).expect("valid batch");

        assert_eq!(
            client.response(&unknown),
            Some(Err(RpcError::UnknownMethod("counter.reset".to_owned())))
        );
        assert!(matches!(client.response(&malformed), Some(Err(RpcError::Malformed(_)))));
        assert_eq!(counter.total, 0);
    }

    #[test]
    fn garbage_batches_are_rejected() {
        let mut client: JsonRpc<()> = JsonRpc::new();
        assert!(matches!(
            client.receive(b"{not json", &mut ()),
            Err(RpcError::Malformed(_))
        ));
        assert!(client.send().is_empty());
    }
}
