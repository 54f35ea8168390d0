pub mod db_utils;
pub mod summary_cache;
