pub mod db;
pub mod gigdb;
pub mod memorydb;
pub mod userdb;
