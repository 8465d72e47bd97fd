/// File name looked up at every level of the settings cascade.
pub const SETTINGS_FILE_NAME: &str = ".classmerge.toml";

/// Generate the `.classmerge.toml` written by `classmerge --init`.
pub fn generate_init_template() -> String {
	r#"# classmerge settings
#
# Settings files are discovered from the working directory upwards, then
# ~/.classmerge.toml. The most specific file wins for defines.

# Stop the directory walk here (the user file is still consulted).
root = true

# Ignore every other settings file, including ~/.classmerge.toml.
# no-external-lookup = true

# Skip ~/.classmerge.toml when this environment variable is truthy.
# root-config-lookup-disable-env-var = "CI"

# Extra directories searched by #include, relative to this file.
include-dirs = []

# Fail on bare macro statements that were never defined.
strict = false

# Macros defined before preprocessing.
[defines]
# _ARMA_ = "1"
"#
	.to_string()
}
