pub(crate) mod health_check_controller;
pub(crate) mod root_controller;
pub(crate) mod workflow_controller;
