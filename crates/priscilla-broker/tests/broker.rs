//! End-to-end tests: real read tasks and a running dispatcher over in-memory
//! duplex streams.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use priscilla_broker::conn::{codec::EnvelopeCodec, connection, handshake};
use priscilla_broker::{BrokerInvoker, Dispatcher, Submitter};
use priscilla_core::config::SERVER_ID;
use priscilla_core::PriscillaConfig;
use priscilla_protocol::{actions, Command, Envelope, Message};
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(200);

struct Broker {
    submit: Submitter,
    _shutdown: watch::Sender<bool>,
}

impl Broker {
    fn start(secret: &str) -> Self {
        let responders = priscilla_responders::compile(&PriscillaConfig::default()).unwrap();
        let (dispatcher, submit) = Dispatcher::new(responders, Arc::new(BrokerInvoker::new()), secret);
        let (tx, rx) = watch::channel(false);
        tokio::spawn(dispatcher.run(rx));
        Self {
            submit,
            _shutdown: tx,
        }
    }

    fn connect(&self) -> Client {
        let (client, server) = tokio::io::duplex(64 * 1024);
        tokio::spawn(connection::serve(server, "test-peer".into(), self.submit.clone()));
        let (r, w) = tokio::io::split(client);
        Client {
            rx: FramedRead::new(r, EnvelopeCodec::new()),
            tx: FramedWrite::new(w, EnvelopeCodec::new()),
        }
    }

    async fn engaged(&self, id: &str, client_type: &str) -> (Client, String) {
        let mut client = self.connect();
        let assigned = client.engage(id, client_type).await;
        (client, assigned)
    }
}

struct Client {
    rx: FramedRead<ReadHalf<DuplexStream>, EnvelopeCodec>,
    tx: FramedWrite<WriteHalf<DuplexStream>, EnvelopeCodec>,
}

impl Client {
    async fn send(&mut self, env: Envelope) {
        self.tx.send(env).await.unwrap();
    }

    async fn recv(&mut self) -> Envelope {
        timeout(WAIT, self.rx.next())
            .await
            .expect("timed out waiting for envelope")
            .expect("connection closed")
            .unwrap()
            .unwrap()
    }

    /// Next frame, or None if the broker closed the stream.
    async fn recv_or_closed(&mut self) -> Option<Envelope> {
        timeout(WAIT, self.rx.next())
            .await
            .expect("timed out waiting for envelope")
            .map(|r| r.unwrap().unwrap())
    }

    async fn assert_quiet(&mut self) {
        assert!(timeout(QUIET, self.rx.next()).await.is_err(), "unexpected envelope");
    }

    async fn engage_with(&mut self, id: &str, cmd: Command) -> Envelope {
        self.send(Envelope::command(id, SERVER_ID, cmd)).await;
        self.recv().await
    }

    async fn engage(&mut self, id: &str, client_type: &str) -> String {
        let mut cmd = Command::new(actions::ENGAGE);
        cmd.kind = client_type.into();
        let reply = self.engage_with(id, cmd).await;
        assert!(reply.is_action(actions::PROCEED), "expected proceed, got {reply:?}");
        let assigned = reply.command.unwrap().data;
        assert_eq!(reply.to, assigned);
        assigned
    }
}

fn chat(to: &str, text: &str) -> Envelope {
    Envelope::message(
        "ignored",
        to,
        Message {
            text: text.into(),
            room: "lobby".into(),
            ..Default::default()
        },
    )
}

fn register(id: &str, class: &str, pattern: &str, help_cmd: &str, help: &str) -> Envelope {
    let cmd = Command {
        action: actions::REGISTER.into(),
        id: id.into(),
        kind: class.into(),
        data: pattern.into(),
        array: vec![help_cmd.into(), help.into()],
        ..Default::default()
    };
    Envelope::command("ignored", SERVER_ID, cmd)
}

#[tokio::test]
async fn engage_without_id_assigns_random_hex() {
    let broker = Broker::start("");
    let (_c, id) = broker.engaged("", "adapter").await;
    assert_eq!(id.len(), 16);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn requested_id_is_honoured_then_reassigned_on_collision() {
    let broker = Broker::start("");
    let (_a, first) = broker.engaged("slack", "adapter").await;
    let (_b, second) = broker.engaged("slack", "adapter").await;
    assert_eq!(first, "slack");
    assert_ne!(second, "slack");
    assert_eq!(second.len(), 16);
}

#[tokio::test]
async fn concurrent_engagements_get_distinct_ids() {
    let broker = Arc::new(Broker::start(""));
    let mut tasks = Vec::new();
    for _ in 0..16 {
        let broker = Arc::clone(&broker);
        tasks.push(tokio::spawn(async move {
            let (client, id) = broker.engaged("same", "responder").await;
            (client, id)
        }));
    }

    let mut ids = HashSet::new();
    let mut clients = Vec::new();
    for t in tasks {
        let (client, id) = t.await.unwrap();
        ids.insert(id);
        clients.push(client);
    }
    assert_eq!(ids.len(), 16);
    assert!(ids.contains("same"));
}

#[tokio::test]
async fn concurrent_distinct_requests_all_honoured() {
    let broker = Arc::new(Broker::start(""));
    let mut tasks = Vec::new();
    for i in 0..16 {
        let broker = Arc::clone(&broker);
        tasks.push(tokio::spawn(async move {
            let requested = format!("client-{i}");
            let (client, id) = broker.engaged(&requested, "responder").await;
            (client, requested, id)
        }));
    }

    let mut clients = Vec::new();
    for t in tasks {
        let (client, requested, id) = t.await.unwrap();
        assert_eq!(id, requested);
        clients.push(client);
    }
}

#[tokio::test]
async fn disengage_for_unknown_id_is_a_no_op() {
    let broker = Broker::start("");
    let (mut slack, _) = broker.engaged("slack", "adapter").await;
    let (mut weather, _) = broker.engaged("weather", "responder").await;

    broker.submit.submit(Envelope::disengage("ghost")).await.unwrap();
    broker.submit.submit(Envelope::disengage("ghost")).await.unwrap();

    weather.send(chat("slack", "still here")).await;
    assert_eq!(slack.recv().await.message.unwrap().text, "still here");
    slack.assert_quiet().await;
}

#[tokio::test]
async fn first_envelope_must_be_engage() {
    let broker = Broker::start("");
    let mut client = broker.connect();
    client.send(chat("", "hello")).await;
    assert!(client.recv_or_closed().await.is_none());
}

#[tokio::test]
async fn bad_credential_gets_terminate_and_close() {
    let broker = Broker::start("s3cret");
    let mut client = broker.connect();

    let mut cmd = Command::new(actions::ENGAGE);
    cmd.time = Some(chrono::Utc::now().timestamp());
    cmd.data = handshake::sign("wrong", cmd.time.unwrap(), "slack").unwrap();
    let reply = client.engage_with("slack", cmd).await;

    assert!(reply.is_action(actions::TERMINATE));
    assert!(client.recv_or_closed().await.is_none());
}

#[tokio::test]
async fn signed_credential_is_accepted() {
    let broker = Broker::start("s3cret");
    let mut client = broker.connect();

    let now = chrono::Utc::now().timestamp();
    let mut cmd = Command::new(actions::ENGAGE).with_data(handshake::sign("s3cret", now, "slack").unwrap());
    cmd.time = Some(now);
    cmd.kind = actions::CLIENT_ADAPTER.into();
    let reply = client.engage_with("slack", cmd).await;
    assert!(reply.is_action(actions::PROCEED));
}

#[tokio::test]
async fn responder_message_relayed_with_verified_source() {
    let broker = Broker::start("");
    let (mut slack, _) = broker.engaged("slack", "adapter").await;
    let (mut weather, _) = broker.engaged("weather", "responder").await;

    weather.send(chat("slack", "sunny")).await;
    let env = slack.recv().await;
    assert_eq!(env.source, "weather");
    assert_eq!(env.message.unwrap().text, "sunny");
}

#[tokio::test]
async fn unknown_destination_is_dropped_without_stalling() {
    let broker = Broker::start("");
    let (mut slack, _) = broker.engaged("slack", "adapter").await;
    let (mut weather, _) = broker.engaged("weather", "responder").await;

    weather.send(chat("ghost", "lost")).await;
    weather.send(chat("slack", "found")).await;
    assert_eq!(slack.recv().await.message.unwrap().text, "found");
}

#[tokio::test]
async fn adapter_cannot_address_connections_directly() {
    let broker = Broker::start("");
    let (mut slack, _) = broker.engaged("slack", "adapter").await;
    let (mut weather, _) = broker.engaged("weather", "responder").await;

    slack.send(chat("weather", "psst")).await;
    weather.assert_quiet().await;
}

#[tokio::test]
async fn registered_responder_receives_matching_chat() {
    let broker = Broker::start("");
    let (mut slack, _) = broker.engaged("slack", "adapter").await;
    let (mut weather, _) = broker.engaged("weather", "responder").await;

    weather
        .send(register("w1", "prefix", r"^weather (\w+)$", "weather <city>", "current conditions"))
        .await;
    slack.send(chat("", "pris weather paris")).await;

    let env = weather.recv().await;
    assert_eq!(env.source, "slack");
    let msg = env.message.unwrap();
    assert_eq!(msg.room, "lobby");
    let matched = msg.matched.unwrap();
    assert_eq!(matched.id, "w1");
    assert_eq!(matched.groups, vec!["weather paris".to_string(), "paris".to_string()]);
}

#[tokio::test]
async fn help_reflects_registrations_and_disengage_prunes_them() {
    let broker = Broker::start("");
    let (mut slack, _) = broker.engaged("slack", "adapter").await;
    let (mut weather, _) = broker.engaged("weather", "responder").await;

    weather
        .send(register("w1", "prefix", r"^weather", "weather", "current conditions"))
        .await;
    slack.send(chat("", "pris help")).await;
    let reply = slack.recv().await;
    assert_eq!(reply.source, SERVER_ID);
    assert_eq!(reply.message.unwrap().text, "pris weather - current conditions");

    drop(weather);
    // The broker learns of the disconnect asynchronously; poll until pruned.
    let mut text = String::new();
    for _ in 0..20 {
        slack.send(chat("", "pris help")).await;
        text = slack.recv().await.message.unwrap().text;
        if text == "No help available" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(text, "No help available");
}

#[tokio::test]
async fn adapter_register_is_rejected() {
    let broker = Broker::start("");
    let (mut slack, _) = broker.engaged("slack", "adapter").await;

    slack.send(register("x", "prefix", "^x$", "x", "x help")).await;
    slack.send(chat("", "pris help")).await;
    assert_eq!(slack.recv().await.message.unwrap().text, "No help available");
}

#[tokio::test]
async fn disengaged_id_can_be_reclaimed() {
    let broker = Broker::start("");
    let (mut first, id) = broker.engaged("slack", "adapter").await;
    assert_eq!(id, "slack");

    first
        .send(Envelope::command("slack", SERVER_ID, Command::new(actions::DISENGAGE)))
        .await;
    assert!(first.recv_or_closed().await.is_none());

    let (_second, id) = broker.engaged("slack", "adapter").await;
    assert_eq!(id, "slack");
}
