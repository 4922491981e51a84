//! Mock manager server for integration testing
//!
//! Speaks enough of the manager protocol to run entity lifecycles without a
//! real PBX: login, create/update/delete/show for any `<Kind>` prefix, with
//! the matching events pushed after each change.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ami_lifecycle::ami::codec::{self, LINE_END};
use ami_lifecycle::ami::Message;
use clap::Parser;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

const BANNER: &str = "Asterisk Call Manager/2.10.0";

#[derive(Parser, Debug, Clone)]
#[command(name = "mock_manager", about = "Mock AMI server for tests")]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind (0 picks a free one)
    #[arg(long, default_value_t = 0)]
    port: u16,

    /// Unrelated events pushed ahead of every entity event
    #[arg(long, default_value_t = 1)]
    noise: usize,

    /// Push entity events before the action reply
    #[arg(long)]
    event_first: bool,

    /// Answer every create with an error
    #[arg(long)]
    reject_create: bool,

    /// Accept changes but never announce them
    #[arg(long)]
    no_events: bool,

    /// Required login name (any login accepted when unset)
    #[arg(long)]
    username: Option<String>,

    /// Required login secret
    #[arg(long)]
    secret: Option<String>,
}

#[derive(Debug, Clone)]
struct Record {
    uuid: String,
    fields: Message,
}

#[derive(Default)]
struct Store {
    /// Live entities per kind prefix
    entities: HashMap<String, Vec<Record>>,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn new_uuid() -> String {
    let n = NEXT_ID.fetch_add(1, Ordering::SeqCst);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!(
        "{:08x}-{:04x}-4{:03x}-8{:03x}-{:012x}",
        nanos,
        std::process::id() & 0xffff,
        n & 0xfff,
        (n >> 12) & 0xfff,
        n
    )
}

fn render(message: &Message) -> String {
    let mut block = String::new();
    for (k, v) in message.iter() {
        block.push_str(k);
        block.push_str(": ");
        block.push_str(v);
        block.push_str(LINE_END);
    }
    block.push_str(LINE_END);
    block
}

fn success(text: &str) -> Message {
    Message::new().with("Response", "Success").with("Message", text)
}

fn error(text: &str) -> Message {
    Message::new().with("Response", "Error").with("Message", text)
}

fn event(name: &str) -> Message {
    Message::new().with("Event", name).with("Privilege", "message,all")
}

fn noise(n: usize) -> Message {
    Message::new()
        .with("Event", "PeerStatus")
        .with("Privilege", "system,all")
        .with("Peer", format!("SIP/{}", 100 + n))
        .with("PeerStatus", "Reachable")
}

/// Reply plus the events that follow it
struct Outcome {
    reply: Message,
    events: Vec<Message>,
    listing: Vec<Message>,
    close: bool,
}

impl Outcome {
    fn reply(reply: Message) -> Self {
        Self {
            reply,
            events: Vec::new(),
            listing: Vec::new(),
            close: false,
        }
    }

    fn with_event(mut self, args: &Args, message: Message) -> Self {
        if !args.no_events {
            self.events.extend((0..args.noise).map(noise));
            self.events.push(message);
        }
        self
    }
}

fn split_action(action: &str) -> Option<(&str, &str)> {
    ["Create", "Update", "Delete", "Show"]
        .iter()
        .find_map(|op| action.strip_suffix(op).map(|kind| (kind, *op)))
        .filter(|(kind, _)| !kind.is_empty())
}

async fn handle(args: &Args, store: &Mutex<Store>, request: &Message) -> Outcome {
    let Some(action) = request.get("Action") else {
        return Outcome::reply(error("Missing action in request"));
    };
    let params: Vec<(&str, &str)> = request.iter().filter(|(k, _)| *k != "Action").collect();

    match action {
        "Login" => {
            let user_ok = args
                .username
                .as_deref()
                .map_or(true, |u| request.get("Username") == Some(u));
            let secret_ok = args
                .secret
                .as_deref()
                .map_or(true, |s| request.get("Secret") == Some(s));
            if user_ok && secret_ok {
                Outcome::reply(success("Authentication accepted"))
            } else {
                Outcome::reply(error("Authentication failed"))
            }
        }
        "Logoff" => {
            let mut outcome = Outcome::reply(
                Message::new()
                    .with("Response", "Goodbye")
                    .with("Message", "Thanks for all the fish."),
            );
            outcome.close = true;
            outcome
        }
        "Ping" => Outcome::reply(success("Pong")),
        _ => {
            let Some((kind, op)) = split_action(action) else {
                return Outcome::reply(error("Invalid/unknown command"));
            };
            let mut store = store.lock().await;
            let records = store.entities.entry(kind.to_string()).or_default();
            let uuid = request.get("Uuid").map(str::to_string);

            match op {
                "Create" => {
                    if args.reject_create {
                        return Outcome::reply(error("Could not create"));
                    }
                    let uuid = new_uuid();
                    let mut fields = Message::new().with("Uuid", uuid.clone());
                    for (k, v) in &params {
                        fields.push(*k, *v);
                    }
                    records.push(Record {
                        uuid,
                        fields: fields.clone(),
                    });

                    let mut created = event(action);
                    for (k, v) in fields.iter() {
                        created.push(k, v);
                    }
                    Outcome::reply(success("Created")).with_event(args, created)
                }
                "Update" => {
                    let Some(record) = records.iter_mut().find(|r| Some(&r.uuid) == uuid.as_ref())
                    else {
                        return Outcome::reply(error("No such entity"));
                    };
                    let mut fields = Message::new();
                    for (k, v) in record.fields.iter() {
                        let changed = params.iter().find(|(pk, _)| *pk == k).map(|(_, pv)| *pv);
                        fields.push(k, changed.unwrap_or(v));
                    }
                    for (k, v) in &params {
                        if !fields.contains(k) {
                            fields.push(*k, *v);
                        }
                    }
                    record.fields = fields.clone();

                    let mut updated = event(action);
                    for (k, v) in fields.iter() {
                        updated.push(k, v);
                    }
                    Outcome::reply(success("Updated")).with_event(args, updated)
                }
                "Delete" => {
                    let Some(pos) = records.iter().position(|r| Some(&r.uuid) == uuid.as_ref())
                    else {
                        return Outcome::reply(error("No such entity"));
                    };
                    let record = records.remove(pos);
                    let deleted = event(action).with("Uuid", record.uuid);
                    Outcome::reply(success("Deleted")).with_event(args, deleted)
                }
                _ => {
                    let matching: Vec<&Record> = records
                        .iter()
                        .filter(|r| uuid.as_ref().map_or(true, |u| &r.uuid == u))
                        .collect();

                    let mut outcome = Outcome::reply(
                        success("Entries will follow").with("EventList", "start"),
                    );
                    for record in &matching {
                        let mut entry = Message::new().with("Event", format!("{}Entry", kind));
                        for (k, v) in record.fields.iter() {
                            entry.push(k, v);
                        }
                        outcome.listing.push(entry);
                    }
                    outcome.listing.push(
                        Message::new()
                            .with("Event", format!("{}EntryComplete", kind))
                            .with("EventList", "Complete")
                            .with("ListItems", matching.len().to_string()),
                    );
                    outcome
                }
            }
        }
    }
}

async fn serve(args: Arc<Args>, store: Arc<Mutex<Store>>, stream: TcpStream) {
    let (reader, writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);

    if writer
        .write_all(format!("{}{}", BANNER, LINE_END).as_bytes())
        .await
        .is_err()
        || writer.flush().await.is_err()
    {
        return;
    }

    loop {
        let raw = match codec::read_block(&mut reader).await {
            Ok(raw) => raw,
            Err(_) => break,
        };
        let request = match codec::decode(&raw) {
            Ok(request) => request,
            Err(e) => {
                let _ = codec::write_block(&mut writer, &render(&error(&e.to_string()))).await;
                continue;
            }
        };

        let outcome = handle(&args, &store, &request).await;

        let mut blocks: Vec<&Message> = Vec::new();
        if args.event_first {
            blocks.extend(&outcome.events);
        }
        blocks.push(&outcome.reply);
        blocks.extend(&outcome.listing);
        if !args.event_first {
            blocks.extend(&outcome.events);
        }
        let out: String = blocks.into_iter().map(render).collect();

        if codec::write_block(&mut writer, &out).await.is_err() || outcome.close {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Arc::new(Args::parse());
    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;

    println!("mock manager listening at: {}", listener.local_addr()?);
    std::io::Write::flush(&mut std::io::stdout())?;

    let store = Arc::new(Mutex::new(Store::default()));
    loop {
        let (stream, _) = listener.accept().await?;
        tokio::spawn(serve(args.clone(), store.clone(), stream));
    }
}
