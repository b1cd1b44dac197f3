use crate::core::round::ProfitRecord;
use crate::policy::BiddingPolicy;
use crate::session::wire::{self, Command, WireError};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

/// Bid replies longer than this are elided in the log below debug verbosity.
const LOG_EXCERPT: usize = 50;

/// What happened over one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub player: String,
    pub policy: String,
    pub rounds_bid: usize,
    pub settlements_applied: usize,
    pub lines_skipped: usize,
    pub profits: Vec<ProfitRecord>,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SessionSummary {
    fn new(player: &str, policy: &str) -> Self {
        let now = Utc::now();
        Self {
            player: player.to_string(),
            policy: policy.to_string(),
            rounds_bid: 0,
            settlements_applied: 0,
            lines_skipped: 0,
            profits: Vec::new(),
            completed: false,
            started_at: now,
            finished_at: now,
        }
    }

    /// This player's final score, if the referee reported one.
    pub fn own_profit(&self) -> Option<f64> {
        self.profits
            .iter()
            .find(|p| p.owner.as_str() == self.player)
            .map(|p| p.value)
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Session Summary ===")?;
        writeln!(f, "Player:       {} ({})", self.player, self.policy)?;
        writeln!(f, "Rounds bid:   {}", self.rounds_bid)?;
        writeln!(f, "Settlements:  {}", self.settlements_applied)?;
        writeln!(f, "Skipped:      {}", self.lines_skipped)?;
        writeln!(f, "Completed:    {}", self.completed)?;
        writeln!(
            f,
            "Duration:     {} ms",
            (self.finished_at - self.started_at).num_milliseconds()
        )?;
        if !self.profits.is_empty() {
            writeln!(f, "\n--- Profits ---")?;
            for profit in &self.profits {
                writeln!(f, "  {}", profit)?;
            }
        }
        Ok(())
    }
}

/// Plays one referee session with a single policy.
///
/// The session is strictly sequential: read a line, act on it, reply if the
/// command calls for it. Protocol errors are logged and skipped; transport
/// errors end the session.
///
/// # Examples
///
/// ```
/// use fctp_player::graph::cache::InstanceCache;
/// use fctp_player::graph::instance::StaticLoader;
/// use fctp_player::policy::FirstEdges;
/// use fctp_player::session::handler::Session;
/// use std::sync::Arc;
///
/// let cache = Arc::new(InstanceCache::new(StaticLoader::default()));
/// let mut session = Session::new("Parallax", FirstEdges::new(cache, 2.0));
///
/// let mut reply = Vec::new();
/// let summary = session.run("name\ninstance FOO 5\n".as_bytes(), &mut reply);
///
/// assert_eq!(String::from_utf8(reply).unwrap(), "name Parallax\nbid\n");
/// assert_eq!(summary.rounds_bid, 1);
/// ```
pub struct Session<P> {
    name: String,
    policy: P,
    verbose: u8,
}

impl<P: BiddingPolicy> Session<P> {
    pub fn new(name: impl Into<String>, policy: P) -> Self {
        Self {
            name: name.into(),
            policy,
            verbose: 1,
        }
    }

    /// At verbosity 2 and above bid replies are logged in full.
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn into_policy(self) -> P {
        self.policy
    }

    /// Connect to a referee over TCP and play until the session closes.
    pub fn connect(&mut self, server: &str) -> Result<SessionSummary, WireError> {
        let stream = TcpStream::connect(server).map_err(|e| {
            error!("Error connecting {}: {}", server, e);
            e
        })?;
        info!("Connected to {}", server);
        let reader = BufReader::new(stream.try_clone()?);
        Ok(self.run(reader, stream))
    }

    /// Drive the protocol loop until `end`, end of input or a transport
    /// failure.
    pub fn run<R: BufRead, W: Write>(&mut self, mut reader: R, mut writer: W) -> SessionSummary {
        let mut summary = SessionSummary::new(&self.name, self.policy.name());
        if let Err(e) = self.serve(&mut reader, &mut writer, &mut summary) {
            error!("Session closed: {}", e);
        }
        summary.finished_at = Utc::now();
        info!(
            "Session finished after {} rounds ({} settlements, {} lines skipped)",
            summary.rounds_bid, summary.settlements_applied, summary.lines_skipped
        );
        summary
    }

    fn serve<R: BufRead, W: Write>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
        summary: &mut SessionSummary,
    ) -> Result<(), WireError> {
        loop {
            let Some(line) = wire::read_line(reader)? else {
                info!("Referee closed the connection");
                return Ok(());
            };
            info!("referee> {}", line);

            match Command::classify(&line) {
                Command::Name => {
                    let reply = format!("name {}", self.name);
                    info!("player> {}", reply);
                    writeln!(writer, "{}", reply)?;
                    writer.flush()?;
                }
                Command::Instance => {
                    let request = match wire::parse_match(&line) {
                        Ok(request) => request,
                        Err(e) => {
                            warn!("{}", e);
                            summary.lines_skipped += 1;
                            continue;
                        }
                    };
                    debug!("Match: {}", request);
                    let pack = self.policy.compute_bid(&request);
                    let reply = pack.to_string();
                    info!("player> {}", self.excerpt(&reply));
                    writer.write_all(reply.as_bytes())?;
                    writer.flush()?;
                    summary.rounds_bid += 1;
                }
                Command::Result => match wire::read_flow(&line, reader) {
                    Ok(flow) => {
                        debug!("Flow: {}", flow);
                        self.policy.update(&flow);
                        summary.settlements_applied += 1;
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!("Abandoning settlement report: {}", e);
                        summary.lines_skipped += 1;
                    }
                },
                Command::End => {
                    let profits = wire::read_profits(&line, reader)?;
                    for profit in &profits {
                        info!("Profit: {}", profit);
                    }
                    summary.profits = profits;
                    summary.completed = true;
                    info!("player> that's all for now!");
                    return Ok(());
                }
                Command::Unknown => {
                    warn!("Unrecognized line: {}", line);
                    summary.lines_skipped += 1;
                }
            }
        }
    }

    fn excerpt<'a>(&self, reply: &'a str) -> std::borrow::Cow<'a, str> {
        if self.verbose >= 2 || reply.len() <= LOG_EXCERPT {
            return reply.into();
        }
        let mut end = LOG_EXCERPT;
        while !reply.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &reply[..end]).into()
    }
}
