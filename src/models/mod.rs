pub mod gigmodel;
pub mod usermodel;
