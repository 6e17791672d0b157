pub mod dates;
pub mod gateway;
pub mod job_store;
pub mod llm;
pub mod orchestrator;
pub mod queue;
pub mod train_search;
pub mod weather;
pub mod worker;
