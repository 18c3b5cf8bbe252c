//! Module `commands`
//!
//! Command line parsing and the command table. The table is built once when
//! the server binds and shared read-only by every session.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::client::Session;
use crate::error::SessionError;
use crate::protocol::handlers::{auth, dirs, files, misc};

/// Future returned by a command handler, borrowing the session.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SessionError>> + Send + 'a>>;

/// A command handler. It reads the verb and argument from the session and
/// writes its own replies.
pub type CommandHandler = for<'a> fn(&'a mut Session) -> HandlerFuture<'a>;

/// Splits a command line into its upper-cased verb and its argument.
///
/// The argument is everything after the first space, trimmed, and is not
/// tokenized any further.
pub fn parse_line(line: &str) -> (String, String) {
    let line = line.trim_matches(|c| c == '\r' || c == '\n');
    match line.split_once(' ') {
        Some((verb, param)) => (verb.to_ascii_uppercase(), param.trim().to_string()),
        None => (line.to_ascii_uppercase(), String::new()),
    }
}

/// Commands accepted before authentication.
pub fn is_auth_command(verb: &str) -> bool {
    verb == "USER" || verb == "PASS"
}

/// Immutable mapping from verb to handler.
pub struct CommandTable {
    handlers: HashMap<&'static str, CommandHandler>,
}

impl CommandTable {
    pub fn new() -> Self {
        let entries: [(&'static str, CommandHandler); 30] = [
            // Authentication
            ("USER", auth::handle_cmd_user),
            ("PASS", auth::handle_cmd_pass),
            // File access
            ("SIZE", files::handle_cmd_size),
            ("MDTM", files::handle_cmd_mdtm),
            ("RETR", files::handle_cmd_retr),
            ("STOR", files::handle_cmd_stor),
            ("APPE", files::handle_cmd_appe),
            ("DELE", files::handle_cmd_dele),
            ("RNFR", files::handle_cmd_rnfr),
            ("RNTO", files::handle_cmd_rnto),
            ("ALLO", files::handle_cmd_allo),
            ("REST", files::handle_cmd_rest),
            // Directory handling
            ("CWD", dirs::handle_cmd_cwd),
            ("PWD", dirs::handle_cmd_pwd),
            ("CDUP", dirs::handle_cmd_cdup),
            ("NLST", dirs::handle_cmd_list),
            ("LIST", dirs::handle_cmd_list),
            ("MKD", dirs::handle_cmd_mkd),
            ("RMD", dirs::handle_cmd_rmd),
            // Connection handling
            ("TYPE", misc::handle_cmd_type),
            ("PASV", misc::handle_cmd_pasv),
            ("EPSV", misc::handle_cmd_pasv),
            ("QUIT", misc::handle_cmd_quit),
            // TLS handling
            ("AUTH", auth::handle_cmd_auth),
            ("PROT", auth::handle_cmd_prot),
            ("PBSZ", auth::handle_cmd_pbsz),
            // Misc
            ("FEAT", misc::handle_cmd_feat),
            ("SYST", misc::handle_cmd_syst),
            ("NOOP", misc::handle_cmd_noop),
            ("OPTS", misc::handle_cmd_opts),
        ];
        Self {
            handlers: entries.into_iter().collect(),
        }
    }

    /// Case-sensitive lookup; callers upper-case the verb first.
    pub fn get(&self, verb: &str) -> Option<CommandHandler> {
        self.handlers.get(verb).copied()
    }

    pub fn contains(&self, verb: &str) -> bool {
        self.handlers.contains_key(verb)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}
