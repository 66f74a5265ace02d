// End-to-end tests for the audio cache against a real PostgreSQL.
//
// One shared testcontainers PostgreSQL instance serves the whole suite; each
// test leases its own migrated database from a pool, so tests can run in
// parallel. The speech provider is an in-process mockito server and the
// bucket is an in-memory store.
//
// These tests need a Docker daemon and are ignored by default:
//     cargo test --test e2e -- --ignored

mod helpers;
mod test_audio_cache_repository;
mod test_audio_pipeline;
