// all integration tests live in a single binary; see helpers for the shared
// setup (random port, fresh database per test)
mod admin;
mod health_check;
mod home;
