pub mod catalog;
pub mod config;
pub mod corpus;
pub mod errors;
pub mod extraction;
pub mod llm_client;
pub mod models;
pub mod recommendation;
pub mod routes;
pub mod state;
