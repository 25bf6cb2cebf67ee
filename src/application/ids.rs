//! Primary-key assignment from the sequence store through the id codec.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::repos::{RepoError, SequenceRepo};
use crate::domain::ids::{IdCodec, IdCodecError};

pub const NOTEBOOK_COUNTER: &str = "notebook_id";
pub const NOTE_COUNTER: &str = "note_id";

#[derive(Debug, Error)]
pub enum IdAllocationError {
    #[error(transparent)]
    Sequence(#[from] RepoError),
    #[error(transparent)]
    Codec(#[from] IdCodecError),
}

#[derive(Clone)]
pub struct IdAllocator {
    sequences: Arc<dyn SequenceRepo>,
    counter: &'static str,
    codec: IdCodec,
}

impl IdAllocator {
    pub fn new(sequences: Arc<dyn SequenceRepo>, counter: &'static str, codec: IdCodec) -> Self {
        Self {
            sequences,
            counter,
            codec,
        }
    }

    /// Reserve the next counter value and encode it. No id is produced unless
    /// the counter allocation succeeded.
    pub async fn next_id(&self) -> Result<String, IdAllocationError> {
        let value = self.sequences.next_value(self.counter).await?;
        let id = self.codec.encode(value)?;
        debug!(
            target = "notekeep::ids",
            counter = self.counter,
            value,
            id = %id,
            "allocated id"
        );
        Ok(id)
    }
}
