mod config_test;
mod scan_test;
mod store_test;
