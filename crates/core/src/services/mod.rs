pub mod corporate_action_service;
pub mod ingest_service;
pub mod reclassification_service;
pub mod report_service;
