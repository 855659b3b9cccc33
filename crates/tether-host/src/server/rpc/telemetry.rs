//! Telemetry RPC method implementation.

use tether_protocol::{EmitAck, EmitRequest};

use super::RpcImpl;

impl RpcImpl {
    pub(super) fn emit_impl(&self, event: EmitRequest) -> EmitAck {
        self.services.telemetry.record(event)
    }
}
