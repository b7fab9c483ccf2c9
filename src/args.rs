use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "ssm_shell",
    about = "AWS Parameter Store Shell - Navigate and manage SSM Parameters like a filesystem, written in Rust."
)]
pub struct Opt {
    /// AWS Region
    #[structopt(short = "r", long = "region", env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,
    /// AWS credentials profile
    #[structopt(short = "p", long = "profile", env = "AWS_PROFILE", default_value = "default")]
    pub profile: String,
    /// Decrypt SecureString values for ls, get and history
    #[structopt(short = "d", long = "decrypt")]
    pub decrypt: bool,
    /// KMS key ARN or ID for SecureString parameters
    #[structopt(short = "k", long = "key")]
    pub key: Option<String>,
    /// Read commands from file (use - for stdin)
    #[structopt(short = "f", long = "file", parse(from_os_str))]
    pub file: Option<PathBuf>,
    /// Verbose logging, repeat for more (-vv)
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    pub verbose: u8,
    /// Runs a single command; without one the shell reads commands from input
    #[structopt(subcommand)]
    pub cmd: Option<Command>,
}

/// One line of shell input
#[derive(StructOpt, Debug)]
#[structopt(name = "ssm_shell")]
pub struct ShellLine {
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt, Debug, PartialEq)]
pub enum Command {
    /// Change your working directory within the parameter store
    #[structopt(name = "cd")]
    Cd {
        /// Path, absolute or relative to the working directory
        path: Option<String>,
    },
    /// List parameters in one or more paths
    #[structopt(name = "ls")]
    Ls {
        /// List parameters recursively
        #[structopt(short = "R", long = "recursive")]
        recurse: bool,
        /// Paths to list, the working directory when empty
        paths: Vec<String>,
    },
    /// Get one or more parameters
    #[structopt(name = "get")]
    Get {
        /// Parameter Names, optionally prefixed with region:
        #[structopt(required = true, min_values = 1)]
        names: Vec<String>,
    },
    /// Create or update a parameter from field=value options
    /// (name, value, type, description, key, pattern, overwrite, region, tier, policies)
    #[structopt(name = "put")]
    Put {
        #[structopt(required = true, min_values = 1)]
        options: Vec<String>,
    },
    /// Remove parameters
    #[structopt(name = "rm")]
    Rm {
        /// Remove paths recursively
        #[structopt(short = "R", long = "recursive")]
        recurse: bool,
        #[structopt(required = true, min_values = 1)]
        paths: Vec<String>,
    },
    /// Copy a parameter or path from src to dst
    #[structopt(name = "cp")]
    Cp {
        /// Copy paths recursively
        #[structopt(short = "R", long = "recursive")]
        recurse: bool,
        src: String,
        dst: String,
    },
    /// Move a parameter or path from src to dst
    #[structopt(name = "mv")]
    Mv { src: String, dst: String },
    /// Display the modification history of a parameter
    #[structopt(name = "history")]
    History { name: String },
    /// Show or change the region
    #[structopt(name = "region")]
    Region { region: Option<String> },
    /// Show or change the credentials profile
    #[structopt(name = "profile")]
    Profile { profile: Option<String> },
    /// Toggle decryption of SecureString values
    #[structopt(name = "decrypt")]
    Decrypt,
    /// Show or set the KMS key used for SecureString parameters
    #[structopt(name = "key")]
    Key { key: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(words: &[&str]) -> Result<Command, structopt::clap::Error> {
        let argv = std::iter::once("ssm_shell").chain(words.iter().cloned());
        ShellLine::from_iter_safe(argv).map(|l| l.cmd)
    }

    #[test]
    fn parses_recursive_flags() {
        assert_eq!(
            line(&["ls", "-R", "/House"]).unwrap(),
            Command::Ls { recurse: true, paths: vec!["/House".to_string()] }
        );
        assert_eq!(
            line(&["cp", "-R", "/House/Stark", "us-west-2:/House/Stark"]).unwrap(),
            Command::Cp {
                recurse: true,
                src: "/House/Stark".to_string(),
                dst: "us-west-2:/House/Stark".to_string(),
            }
        );
        assert_eq!(line(&["ls"]).unwrap(), Command::Ls { recurse: false, paths: vec![] });
    }

    #[test]
    fn rejects_missing_arguments() {
        assert!(line(&["rm"]).is_err());
        assert!(line(&["mv", "/only-one"]).is_err());
        assert!(line(&["teleport"]).is_err());
    }

    #[test]
    fn global_options() {
        let opt = Opt::from_iter_safe(&["ssm_shell", "-r", "eu-west-1", "-d", "-vv", "get", "/a", "/b"]).unwrap();
        assert_eq!(opt.region, "eu-west-1");
        assert!(opt.decrypt);
        assert_eq!(opt.verbose, 2);
        assert_eq!(
            opt.cmd,
            Some(Command::Get { names: vec!["/a".to_string(), "/b".to_string()] })
        );
    }
}
