mod logging_test;
mod spawn_test;
