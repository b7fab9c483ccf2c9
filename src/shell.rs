use failure::Error;
use std::io::{BufRead, Write};
use structopt::clap::ErrorKind;
use structopt::StructOpt;
use tracing::{debug, info};

use crate::args::{Command, ShellLine};
use crate::put_options::parse_put_options;
use crate::ssm_errors::{SSMError, SSMResult};
use crate::ssm_list::CancelToken;
use crate::ssm_parameters::{ListResult, ParameterPath, SessionState};
use crate::ssm_path::{fqp, resolve};
use crate::ssm_store::ParameterStore;

#[derive(Debug, PartialEq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Splits a command line into words with POSIX shell quoting rules.
pub fn split_words(line: &str) -> SSMResult<Vec<String>> {
    shell_words::split(line)
        .map_err(|e| SSMError::InvalidInput(format!("{} in: {}", e, line)))
}

/// Runs commands against a store on behalf of one session.
pub struct Shell {
    store: ParameterStore,
    session: SessionState,
    cancel: CancelToken,
}

impl Shell {
    pub fn new(store: ParameterStore, session: SessionState, cancel: CancelToken) -> Self {
        Shell {
            store,
            session,
            cancel,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    fn resolve(&self, input: &str) -> ParameterPath {
        resolve(input, &self.session.cwd, &self.session.region)
    }

    fn resolve_all(&self, inputs: &[String]) -> Vec<ParameterPath> {
        inputs.iter().map(|p| self.resolve(p)).collect()
    }

    pub fn execute<W: Write>(&mut self, cmd: Command, out: &mut W) -> Result<(), Error> {
        debug!("Executing {:?}", cmd);
        match cmd {
            Command::Cd { path } => {
                if let Some(path) = path {
                    let target = self.resolve(&path);
                    self.store.set_cwd(&mut self.session, &target)?;
                }
            }
            Command::Ls { recurse, paths } => {
                let paths = if paths.is_empty() {
                    vec![self.session.cwd.clone()]
                } else {
                    paths
                };
                for p in &paths {
                    let target = self.resolve(p);
                    self.cancel.arm();
                    let result = self.store.list(&self.session, &target, recurse, &self.cancel);
                    self.cancel.disarm();
                    let mut entries = match result? {
                        ListResult::Complete(entries) => entries,
                        ListResult::Cancelled => return Ok(()),
                    };
                    entries.sort();
                    if paths.len() > 1 && !entries.is_empty() {
                        writeln!(out, "{}:", p)?;
                    }
                    for entry in entries {
                        writeln!(out, "{}", entry)?;
                    }
                }
            }
            Command::Get { names } => {
                let paths = self.resolve_all(&names);
                let result = self.store.get(&self.session, &paths)?;
                for p in &result.parameters {
                    writeln!(out, "{}", serde_json::to_string(p)?)?;
                }
                if !result.invalid_parameters.is_empty() {
                    eprintln!("Invalid parameters: {}", result.invalid_parameters.join(", "));
                }
            }
            Command::Put { options } => {
                let put = parse_put_options(&options, &self.session)?;
                let name = fqp(&put.request.name, &self.session.cwd);
                let version = self.store.put(&self.session, put.request, &put.region)?;
                writeln!(out, "Put {} version {}", name, version)?;
            }
            Command::Rm { recurse, paths } => {
                let paths = self.resolve_all(&paths);
                self.store.remove(&self.session, &paths, recurse)?;
            }
            Command::Cp { recurse, src, dst } => {
                let (src, dst) = (self.resolve(&src), self.resolve(&dst));
                self.store.copy(&self.session, &src, &dst, recurse)?;
            }
            Command::Mv { src, dst } => {
                let (src, dst) = (self.resolve(&src), self.resolve(&dst));
                self.store.move_path(&self.session, &src, &dst)?;
            }
            Command::History { name } => {
                let target = self.resolve(&name);
                let versions = self
                    .store
                    .get_history(&self.session, &target, self.session.decrypt)?;
                for v in &versions {
                    writeln!(out, "{}", serde_json::to_string(v)?)?;
                }
            }
            Command::Region { region: None } => writeln!(out, "{}", self.session.region)?,
            Command::Region {
                region: Some(region),
            } => {
                self.store.client(&self.session, &region)?;
                info!("Region {} -> {}", self.session.region, region);
                self.session.region = region;
            }
            Command::Profile { profile: None } => writeln!(out, "{}", self.session.profile)?,
            Command::Profile {
                profile: Some(profile),
            } => {
                let previous = std::mem::replace(&mut self.session.profile, profile);
                if let Err(err) = self.store.client(&self.session, &self.session.region) {
                    self.session.profile = previous;
                    return Err(err.into());
                }
            }
            Command::Decrypt => {
                self.session.decrypt = !self.session.decrypt;
                writeln!(out, "Decrypt is {}", self.session.decrypt)?;
            }
            Command::Key { key: None } => {
                if let Some(ref key) = self.session.key {
                    writeln!(out, "{}", key)?;
                }
            }
            Command::Key { key: Some(key) } => self.session.key = Some(key),
        }
        Ok(())
    }

    pub fn run_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Flow, Error> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Flow::Continue);
        }
        if line == "exit" || line == "quit" {
            return Ok(Flow::Exit);
        }
        let words = split_words(line)?;
        let argv = std::iter::once("ssm_shell".to_string()).chain(words);
        match ShellLine::from_iter_safe(argv) {
            Ok(parsed) => self.execute(parsed.cmd, out)?,
            Err(ref e) if e.kind == ErrorKind::HelpDisplayed => writeln!(out, "{}", e.message)?,
            Err(e) => return Err(e.into()),
        }
        Ok(Flow::Continue)
    }

    /// Processes input line by line. Failed lines are reported on stderr and
    /// skipped; returns how many failed.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        out: &mut W,
        prompt: bool,
    ) -> Result<usize, Error> {
        let mut failures = 0;
        let mut lines = input.lines();
        loop {
            if prompt {
                write!(out, "{}>", self.session.cwd)?;
                out.flush()?;
            }
            let line = match lines.next() {
                Some(line) => line?,
                None => break,
            };
            match self.run_line(&line, out) {
                Ok(Flow::Exit) => break,
                Ok(Flow::Continue) => {}
                Err(err) => {
                    failures += 1;
                    eprintln!("Error: {}", err);
                }
            }
        }
        Ok(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_ssm::{store_with, MockSSM, REGION};
    use std::rc::Rc;

    fn shell(mock: &Rc<MockSSM>) -> Shell {
        Shell::new(
            store_with(mock),
            SessionState::new(REGION, "default"),
            CancelToken::new(),
        )
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn splits_quoted_words() {
        assert_eq!(
            split_words("put name=/a \"value=hello world\" description='it''s'").unwrap(),
            vec!["put", "name=/a", "value=hello world", "description=its"]
        );
        assert_eq!(
            split_words("  value=\"say \\\"hi\\\"\"  ").unwrap(),
            vec!["value=say \"hi\""]
        );
        assert_eq!(split_words("a\\ b c").unwrap(), vec!["a b", "c"]);
        assert!(matches!(split_words("put value='open"), Err(SSMError::InvalidInput(_))));
        assert!(split_words("").unwrap().is_empty());
    }

    #[test]
    fn runs_a_script() {
        let mock = Rc::new(MockSSM::with_names(&[
            "/House/Stark/Eddard",
            "/House/Stark/Catelyn",
            "/House/Lannister/Tyrion",
        ]));
        let mut sh = shell(&mock);
        let script = "\
# set up the Starks
cd /House/Stark
put name=Arya \"value=A girl has no name\"
ls
cd ..
ls -R Lannister
rm Stark/Catelyn
ls Stark Lannister
";
        let mut out = Vec::new();
        let failures = sh.run(script.as_bytes(), &mut out, false).unwrap();
        assert_eq!(failures, 0);
        assert_eq!(
            output(out),
            "\
Put /House/Stark/Arya version 1
Arya
Catelyn
Eddard
/House/Lannister/Tyrion
Stark:
Arya
Eddard
Lannister:
Tyrion
"
        );
        assert_eq!(sh.session().cwd, "/House");
        assert_eq!(mock.latest("/House/Stark/Arya").unwrap().value, "A girl has no name");
    }

    #[test]
    fn failed_lines_are_counted_and_skipped() {
        let mock = Rc::new(MockSSM::with_names(&["/House/Stark/Eddard"]));
        let mut sh = shell(&mock);
        let script = "cd /nowhere\nrm /House/Stark\nbogus\nmv /House/Stark /House/Snow\nexit\nrm -R /House\n";
        let mut out = Vec::new();
        let failures = sh.run(script.as_bytes(), &mut out, false).unwrap();
        assert_eq!(failures, 3);
        assert_eq!(mock.names(), vec!["/House/Snow/Eddard".to_string()]);
    }

    #[test]
    fn session_verbs() {
        let mock = Rc::new(MockSSM::new());
        let mut sh = shell(&mock);
        let mut out = Vec::new();
        for line in &["decrypt", "key alias/stark", "key", "region", "profile"] {
            assert_eq!(sh.run_line(line, &mut out).unwrap(), Flow::Continue);
        }
        assert_eq!(output(out), "Decrypt is true\nalias/stark\nus-east-1\ndefault\n");
        assert!(sh.session().decrypt);

        let mut out = Vec::new();
        assert!(sh.run_line("region mars-north-1", &mut out).is_err());
        assert_eq!(sh.session().region, REGION);
    }

    #[test]
    fn get_and_history_print_json_lines() {
        let mock = Rc::new(MockSSM::with_names(&["/House/Stark/Eddard"]));
        let mut sh = shell(&mock);
        let mut out = Vec::new();
        sh.run_line("put name=/House/Stark/Eddard value=Headless overwrite=true", &mut out).unwrap();
        let mut out = Vec::new();
        sh.run_line("get /House/Stark/Eddard", &mut out).unwrap();
        let printed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(printed["value"], "Headless");
        assert_eq!(printed["type"], "String");

        let mut out = Vec::new();
        sh.run_line("history /House/Stark/Eddard", &mut out).unwrap();
        assert_eq!(output(out).lines().count(), 2);
    }
}
