//! Outbound gateways - the model provider and the chat platform

pub mod console;
pub mod openai;
