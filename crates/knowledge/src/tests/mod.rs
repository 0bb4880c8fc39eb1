//! End-to-end tests over a small in-memory corpus.

mod scenarios;
