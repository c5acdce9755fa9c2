//! Dispatches one `put()` call to the owning session's frontend callback and, for
//! passthrough data, to every stacked successor that declares a matching input — by
//! direct, synchronous invocation, inline in the caller's own thread (spec.md §5).

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::output::{Payload, PdOutput, ProtocolDatum};

/// `put(start, end, output, payload)`, spec.md §4.4.
pub fn put(instance: &Instance, start: u64, end: u64, output: &Arc<PdOutput>, payload: Payload) -> Result<()> {
    if start > end {
        return Err(Error::arg("put(): start must be <= end"));
    }
    if payload.output_type() != output.output_type {
        log::warn!(
            "instance {}: put() payload type does not match output binding {}, dropping",
            instance.id,
            output.id
        );
        return Ok(());
    }
    if let (Payload::Meta { value }, Some(meta)) = (&payload, &output.meta) {
        if value.kind() != meta.value_kind {
            log::warn!(
                "instance {}: put() meta value kind does not match output binding {}'s declared type, dropping",
                instance.id,
                output.id
            );
            return Ok(());
        }
    }

    let datum = ProtocolDatum {
        start_sample: start,
        end_sample: end,
        output_id: output.id,
        output_type: output.output_type,
        proto_id: output.proto_id.clone(),
        payload: payload.clone(),
    };

    if let Some(session) = instance.session() {
        session.dispatch(&datum);
    }

    if output.output_type == crate::output::OutputType::Passthrough {
        for successor in instance.next_snapshot() {
            if successor.decoder.inputs.iter().any(|input| input == &output.proto_id) {
                successor.deliver_passthrough(datum.clone())?;
            }
        }
    }

    Ok(())
}
