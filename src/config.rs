//! Config module for gravatar-localizer
//!
//! Every value defaults to the layout the tool has always used (`./work/` in,
//! `./gravatar/` out), so running without arguments needs no setup.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[clap(about, version)]
pub struct Config {
    /// Directory tree of HTML files to rewrite in place
    #[clap(long, env = "GRAVATAR_WORK_DIR", default_value = "./work/")]
    pub work_dir: PathBuf,

    /// Directory downloaded avatars are written to
    #[clap(long, env = "GRAVATAR_OUT_DIR", default_value = "./gravatar/")]
    pub out_dir: PathBuf,

    /// URL path the output directory is served under
    #[clap(long, env = "GRAVATAR_PUBLIC_PATH", default_value = "/img/gravatar")]
    pub public_path: String,

    /// Base URL avatars are fetched from
    #[clap(
        long,
        env = "GRAVATAR_AVATAR_URL",
        default_value = "https://www.gravatar.com/avatar"
    )]
    pub avatar_url: String,
}

pub fn config() -> Config {
    Config::parse()
}
