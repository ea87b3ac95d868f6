mod common;
mod queue;
mod service;
