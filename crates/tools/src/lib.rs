//! Experiment harness for the rmcts engine: engine-vs-engine selfplay on the
//! reference games with JSONL logging.

pub mod selfplay;
