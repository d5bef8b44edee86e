use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use canvas::consts::{DEFAULT_BRUSH_SIZE, DEFAULT_OPACITY, DEFAULT_STROKE_COLOR};
use canvas::element::{DrawElement, ElementRecord, StrokeStyle};
use canvas::engine::{Action, CanvasEngine};
use canvas::identity;
use canvas::input::{Modifiers, Tool};
use canvas::sync::{MergeOutcome, PendingWrite, RemoteEvent};
use canvas::viewport::Point;
use clap::{Args, Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use uuid::Uuid;
use wire::{Data, FRAME_MESSAGE, Frame, Status};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("identity file unreadable: {0}")]
    IdentityFile(#[from] io::Error),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("timed out waiting for websocket frame")]
    Timeout,
    #[error("server returned error for {syscall}: {message}")]
    ServerError { syscall: String, message: String },
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("nothing was drawn; nothing to send")]
    NothingDrawn,
    #[error("gave up on {0} unacknowledged write(s)")]
    WritesDropped(usize),
}

#[derive(Parser, Debug)]
#[command(name = "freedraw-cli", about = "FreeDraw API and websocket CLI")]
struct Cli {
    #[arg(long, env = "FREEDRAW_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "FREEDRAW_USER", help = "Identity to act as, in place of a login")]
    user: Option<String>,

    #[arg(
        long,
        env = "FREEDRAW_IDENTITY_FILE",
        help = "Where the resolved identity is remembered between runs (default ~/.freedraw-id)"
    )]
    identity_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    base_url: String,
    user: Option<String>,
    identity_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    Elements,
    Ws(WsCommand),
}

#[derive(Args, Debug)]
struct WsCommand {
    #[command(subcommand)]
    command: WsSubcommand,
}

#[derive(Subcommand, Debug)]
enum WsSubcommand {
    Join(JoinArgs),
    Draw(DrawCommand),
    Erase(EraseArgs),
}

#[derive(Args, Debug)]
struct JoinArgs {
    #[arg(long, default_value_t = false, help = "Stay connected and print peer activity")]
    watch: bool,
}

#[derive(Args, Debug)]
struct DrawCommand {
    #[command(subcommand)]
    command: ShapeSubcommand,
}

#[derive(Subcommand, Debug)]
enum ShapeSubcommand {
    Pen(PenArgs),
    Line(SegmentArgs),
    Arrow(SegmentArgs),
    Rect(SegmentArgs),
    Circle(SegmentArgs),
    Text(TextArgs),
}

impl ShapeSubcommand {
    fn style(&self) -> &StyleArgs {
        match self {
            Self::Pen(args) => &args.style,
            Self::Line(args) | Self::Arrow(args) | Self::Rect(args) | Self::Circle(args) => {
                &args.style
            }
            Self::Text(args) => &args.style,
        }
    }
}

#[derive(Args, Debug)]
struct PenArgs {
    #[arg(
        long = "point",
        value_parser = parse_point,
        required = true,
        help = "Stroke vertex as X,Y; repeat once per sample"
    )]
    points: Vec<Point>,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Args, Debug)]
struct SegmentArgs {
    #[arg(long, value_parser = parse_point, help = "Start point as X,Y")]
    start: Point,

    #[arg(long, value_parser = parse_point, help = "End point as X,Y")]
    end: Point,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Args, Debug)]
struct TextArgs {
    #[arg(long, value_parser = parse_point, help = "Baseline anchor as X,Y")]
    at: Point,

    text: String,

    #[command(flatten)]
    style: StyleArgs,
}

#[derive(Args, Debug)]
struct StyleArgs {
    #[arg(long, default_value = DEFAULT_STROKE_COLOR)]
    color: String,

    #[arg(long, default_value_t = DEFAULT_BRUSH_SIZE)]
    brush_size: f64,

    #[arg(long, value_parser = parse_stroke_style, default_value = "solid")]
    stroke_style: StrokeStyle,

    #[arg(long, default_value_t = DEFAULT_OPACITY)]
    opacity: u8,
}

#[derive(Args, Debug)]
struct EraseArgs {
    #[arg(long)]
    id: String,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = CliContext {
        base_url: cli.base_url,
        user: cli.user,
        identity_file: cli.identity_file.unwrap_or_else(default_identity_file),
    };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Elements => run_elements(&ctx).await,
        Command::Ws(ws) => run_ws(&ctx, ws).await,
    }
}

async fn run_ping(cli: &CliContext) -> Result<(), CliError> {
    let client = reqwest::Client::new();
    let url = format!("{}/healthz", cli.base_url.trim_end_matches('/'));
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError {
            syscall: format!("HTTP {}", status.as_u16()),
            message: "health check failed".to_owned(),
        });
    }
    println!("ok");
    Ok(())
}

async fn run_elements(cli: &CliContext) -> Result<(), CliError> {
    let json = fetch_elements_json(cli).await?;
    print_json(&json)
}

async fn fetch_elements_json(cli: &CliContext) -> Result<Value, CliError> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/elements", cli.base_url.trim_end_matches('/'));
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError {
            syscall: format!("HTTP {}", status.as_u16()),
            message: "element fetch failed".to_owned(),
        });
    }
    Ok(response.json::<Value>().await?)
}

async fn run_ws(cli: &CliContext, ws: WsCommand) -> Result<(), CliError> {
    match ws.command {
        WsSubcommand::Join(args) => run_ws_join(cli, args).await,
        WsSubcommand::Draw(draw) => run_ws_draw(cli, draw).await,
        WsSubcommand::Erase(args) => run_ws_erase(cli, args).await,
    }
}

async fn run_ws_join(cli: &CliContext, args: JoinArgs) -> Result<(), CliError> {
    let identity = resolve_identity(cli.user.as_deref(), &cli.identity_file)?;
    let mut stream = connect_session(cli, &identity).await?;
    let done = join_canvas(&mut stream).await?;

    let elements = done
        .data
        .get("elements")
        .cloned()
        .ok_or(CliError::MissingField("elements"))?;
    let online = done.data.get("online").and_then(Value::as_u64).unwrap_or(1);
    eprintln!(
        "joined: {} element(s), {online} online",
        elements.as_array().map_or(0, Vec::len)
    );
    print_json(&elements)?;

    if !args.watch {
        return Ok(());
    }

    let initial: Vec<DrawElement> = serde_json::from_value(elements)?;
    let mut engine = CanvasEngine::new(identity);
    engine.connect(initial);
    watch_canvas(cli, &mut stream, &mut engine).await
}

async fn watch_canvas(
    cli: &CliContext,
    stream: &mut WsStream,
    engine: &mut CanvasEngine,
) -> Result<(), CliError> {
    eprintln!("watching for peer activity; Ctrl-C to stop");
    loop {
        let frame = match recv_next(stream, Duration::from_secs(60)).await {
            Ok(frame) => frame,
            Err(CliError::Timeout) => continue,
            Err(error) => return Err(error),
        };
        // Peer activity arrives as request frames; everything else is
        // leftover response traffic.
        if frame.status != Status::Request {
            continue;
        }
        let Some(event) = remote_event(&frame) else {
            continue;
        };

        let outcome = engine.apply_remote(event);
        if outcome == MergeOutcome::RefetchRequired {
            let elements: Vec<DrawElement> = serde_json::from_value(fetch_elements_json(cli).await?)?;
            engine.reload(elements);
        }

        let line = serde_json::json!({
            "syscall": frame.syscall,
            "from": frame.from,
            "outcome": outcome_name(outcome),
            "elements": engine.elements().len(),
            "online": engine.status().online,
        });
        println!("{}", serde_json::to_string(&line)?);
    }
}

fn remote_event(frame: &Frame) -> Option<RemoteEvent> {
    match frame.syscall.as_str() {
        "element:insert" => {
            let record = serde_json::to_value(&frame.data)
                .ok()
                .and_then(|value| serde_json::from_value::<ElementRecord>(value).ok())?;
            let element = DrawElement::try_from(record).ok()?;
            Some(RemoteEvent::Inserted(element))
        }
        "element:delete" => {
            let id = frame.data.get("id")?.as_str()?.to_owned();
            Some(RemoteEvent::Deleted { id })
        }
        "presence:sync" => {
            let online = frame.data.get("online")?.as_u64()?;
            Some(RemoteEvent::Presence { online: usize::try_from(online).unwrap_or(1) })
        }
        _ => None,
    }
}

fn outcome_name(outcome: MergeOutcome) -> &'static str {
    match outcome {
        MergeOutcome::Inserted => "inserted",
        MergeOutcome::AlreadyPresent => "already-present",
        MergeOutcome::RefetchRequired => "reloaded",
        MergeOutcome::PresenceUpdated => "presence",
    }
}

async fn run_ws_draw(cli: &CliContext, draw: DrawCommand) -> Result<(), CliError> {
    let identity = resolve_identity(cli.user.as_deref(), &cli.identity_file)?;
    let mut stream = connect_session(cli, &identity).await?;
    let done = join_canvas(&mut stream).await?;
    let initial: Vec<DrawElement> = serde_json::from_value(
        done.data
            .get("elements")
            .cloned()
            .ok_or(CliError::MissingField("elements"))?,
    )?;

    let mut engine = CanvasEngine::new(identity);
    engine.connect(initial);
    apply_style(&mut engine, draw.command.style());

    let Some(element) = synthesize_gesture(&mut engine, &draw.command) else {
        return Err(CliError::NothingDrawn);
    };
    eprintln!("committed {} locally", element.id);

    let dropped = drain_outbox(&mut stream, &mut engine).await?;
    if dropped > 0 {
        return Err(CliError::WritesDropped(dropped));
    }

    eprintln!("persisted {}", element.id);
    print_json(&serde_json::to_value(ElementRecord::from(element))?)?;
    Ok(())
}

async fn run_ws_erase(cli: &CliContext, args: EraseArgs) -> Result<(), CliError> {
    let identity = resolve_identity(cli.user.as_deref(), &cli.identity_file)?;
    let mut stream = connect_session(cli, &identity).await?;
    join_canvas(&mut stream).await?;

    let request = Frame::request("element:delete", Data::new()).with_data("id", args.id.clone());
    let request_id = request.id;
    send_frame(&mut stream, &request).await?;
    let done = wait_for_terminal_response(&mut stream, request_id, "element:delete").await?;

    eprintln!("erased {}", args.id);
    print_json(&serde_json::to_value(&done.data)?)?;
    Ok(())
}

fn apply_style(engine: &mut CanvasEngine, style: &StyleArgs) {
    engine.set_color(style.color.clone());
    engine.set_brush_size(style.brush_size);
    engine.set_stroke_style(style.stroke_style);
    engine.set_opacity(style.opacity);
}

/// Replay the requested shape as pointer input and hand back the element
/// the engine committed. The matching insert is left in the outbox.
fn synthesize_gesture(engine: &mut CanvasEngine, shape: &ShapeSubcommand) -> Option<DrawElement> {
    let actions = match shape {
        ShapeSubcommand::Pen(args) => {
            engine.set_tool(Tool::Pen);
            let mut points = args.points.iter().copied();
            let first = points.next()?;
            let mut actions = engine.on_pointer_down(first);
            for point in points {
                actions.extend(engine.on_pointer_move(point, Modifiers::default()));
            }
            actions.extend(engine.on_pointer_up());
            actions
        }
        ShapeSubcommand::Line(args) => segment_gesture(engine, Tool::Line, args),
        ShapeSubcommand::Arrow(args) => segment_gesture(engine, Tool::Arrow, args),
        ShapeSubcommand::Rect(args) => segment_gesture(engine, Tool::Rectangle, args),
        ShapeSubcommand::Circle(args) => segment_gesture(engine, Tool::Circle, args),
        ShapeSubcommand::Text(args) => {
            engine.set_tool(Tool::Text);
            let mut actions = engine.on_pointer_down(args.at);
            actions.extend(engine.submit_text(&args.text));
            actions
        }
    };

    actions.into_iter().find_map(|action| match action {
        Action::ElementCommitted(element) => Some(element),
        _ => None,
    })
}

fn segment_gesture(engine: &mut CanvasEngine, tool: Tool, args: &SegmentArgs) -> Vec<Action> {
    engine.set_tool(tool);
    let mut actions = engine.on_pointer_down(args.start);
    actions.extend(engine.on_pointer_move(args.end, Modifiers::default()));
    actions.extend(engine.on_pointer_up());
    actions
}

/// Send every queued write, retrying rejected ones until the outbox gives
/// up on them. Returns how many writes were dropped.
async fn drain_outbox(stream: &mut WsStream, engine: &mut CanvasEngine) -> Result<usize, CliError> {
    let mut dropped = 0;
    while let Some(write) = engine.next_pending() {
        let element_id = write.element_id().to_owned();
        let frame = write_frame(write);
        let request_id = frame.id;
        let syscall = frame.syscall.clone();

        send_frame(stream, &frame).await?;
        match wait_for_terminal_response(stream, request_id, &syscall).await {
            Ok(_) => {
                engine.acknowledge_write();
                eprintln!("acknowledged {element_id}");
            }
            Err(CliError::ServerError { syscall, message }) => {
                eprintln!("{syscall} rejected: {message}");
                if let Some(write) = engine.record_write_failure() {
                    eprintln!("giving up on {} after repeated rejections", write.element_id());
                    dropped += 1;
                }
            }
            Err(error) => return Err(error),
        }
    }
    Ok(dropped)
}

fn write_frame(write: &PendingWrite) -> Frame {
    match write {
        PendingWrite::Insert(element) => {
            Frame::request("element:insert", record_data(&ElementRecord::from(element.clone())))
        }
        PendingWrite::Delete { id } => {
            Frame::request("element:delete", Data::new()).with_data("id", id.clone())
        }
    }
}

fn record_data(record: &ElementRecord) -> Data {
    let Ok(Value::Object(map)) = serde_json::to_value(record) else {
        return Data::new();
    };
    map.into_iter().collect()
}

async fn connect_session(cli: &CliContext, identity: &str) -> Result<WsStream, CliError> {
    let url = ws_url(&cli.base_url, identity)?;
    let (mut stream, _) = connect_async(url)
        .await
        .map_err(|error| CliError::WsConnect(Box::new(error)))?;

    let welcome = wait_for_session_connected(&mut stream).await?;
    let user_id = welcome
        .data
        .get("user_id")
        .and_then(Value::as_str)
        .unwrap_or(identity);
    eprintln!("connected as {user_id}");
    Ok(stream)
}

async fn join_canvas(stream: &mut WsStream) -> Result<Frame, CliError> {
    let join = Frame::request("canvas:join", Data::new());
    let join_id = join.id;
    send_frame(stream, &join).await?;
    wait_for_terminal_response(stream, join_id, "canvas:join").await
}

fn ws_url(base_url: &str, user: &str) -> Result<String, CliError> {
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{}/api/ws?user={user}", rest.trim_end_matches('/')));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{}/api/ws?user={user}", rest.trim_end_matches('/')));
    }

    Err(CliError::InvalidBaseUrl(base_url.to_owned()))
}

async fn wait_for_session_connected(stream: &mut WsStream) -> Result<Frame, CliError> {
    loop {
        let frame = recv_next(stream, Duration::from_secs(5)).await?;
        if frame.syscall == "session:connected" {
            return Ok(frame);
        }
    }
}

async fn wait_for_terminal_response(
    stream: &mut WsStream,
    request_id: Uuid,
    syscall: &str,
) -> Result<Frame, CliError> {
    loop {
        let frame = recv_next(stream, Duration::from_secs(15)).await?;
        if frame.parent_id != Some(request_id) {
            continue;
        }
        if frame.syscall != syscall {
            continue;
        }
        if !frame.status.is_terminal() {
            continue;
        }
        if frame.status == Status::Error {
            return Err(CliError::ServerError {
                syscall: frame.syscall,
                message: frame
                    .data
                    .get(FRAME_MESSAGE)
                    .and_then(Value::as_str)
                    .unwrap_or("unknown websocket error")
                    .to_owned(),
            });
        }
        return Ok(frame);
    }
}

async fn send_frame(stream: &mut WsStream, frame: &Frame) -> Result<(), CliError> {
    let json = serde_json::to_string(frame)?;
    stream
        .send(Message::Text(json.into()))
        .await
        .map_err(|error| CliError::WsConnect(Box::new(error)))
}

async fn recv_next(stream: &mut WsStream, timeout: Duration) -> Result<Frame, CliError> {
    let fut = async {
        loop {
            let Some(message) = stream.next().await else {
                return Err(CliError::WsClosed);
            };
            match message.map_err(|error| CliError::WsConnect(Box::new(error)))? {
                Message::Text(text) => return Ok(serde_json::from_str::<Frame>(&text)?),
                Message::Close(_) => return Err(CliError::WsClosed),
                _ => {}
            }
        }
    };

    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| CliError::Timeout)?
}

fn default_identity_file() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_else(|| OsString::from("."));
    PathBuf::from(home).join(".freedraw-id")
}

/// Decide which identity this run acts as and remember it for the next
/// one. A failed write-back is reported but never fatal.
fn resolve_identity(user: Option<&str>, path: &Path) -> Result<String, CliError> {
    let stored = match fs::read_to_string(path) {
        Ok(contents) => {
            let trimmed = contents.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => None,
        Err(error) => return Err(CliError::IdentityFile(error)),
    };

    let resolved = identity::resolve(user, stored.as_deref());
    if stored.as_deref() != Some(resolved.as_str()) {
        if let Err(error) = fs::write(path, &resolved) {
            eprintln!("could not store identity in {}: {error}", path.display());
        }
    }
    Ok(resolved)
}

fn parse_point(raw: &str) -> Result<Point, String> {
    let Some((x, y)) = raw.split_once(',') else {
        return Err(format!("expected X,Y but got `{raw}`"));
    };
    let x = x.trim().parse::<f64>().map_err(|error| format!("bad X in `{raw}`: {error}"))?;
    let y = y.trim().parse::<f64>().map_err(|error| format!("bad Y in `{raw}`: {error}"))?;
    Ok(Point::new(x, y))
}

fn parse_stroke_style(raw: &str) -> Result<StrokeStyle, String> {
    match raw {
        "solid" => Ok(StrokeStyle::Solid),
        "dashed" => Ok(StrokeStyle::Dashed),
        "dotted" => Ok(StrokeStyle::Dotted),
        _ => Err(format!("unknown stroke style `{raw}` (expected solid, dashed, or dotted)")),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
