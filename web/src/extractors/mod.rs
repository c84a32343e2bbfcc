pub(crate) mod workflow_payload;
