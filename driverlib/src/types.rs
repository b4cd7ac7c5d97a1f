pub type JobId = String;
pub type Program = String;
pub type Args = Vec<String>;
pub type Envs = Vec<(String, String)>;
pub type ExitCode = i32;
