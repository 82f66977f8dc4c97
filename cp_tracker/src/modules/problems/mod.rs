pub mod syncer;
