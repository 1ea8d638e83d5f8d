//! `vellum-cli`: an interactive RESP client, the way `redis-cli` talks
//! to a Redis server. Reads a line, splits it into command tokens,
//! sends it as a RESP command array, and prints whatever frame comes
//! back (§9 "interactive client").

use std::{
    io::{Read, Write},
    net::TcpStream,
};

use clap::Parser as ClapParser;
use rustyline::{error::ReadlineError, DefaultEditor};
use vellum::{Frame, Parser as RespParser};

#[derive(Debug, ClapParser)]
#[command(name = "vellum-cli", about = "Interactive client for a vellum server")]
struct Cli {
    /// Server address, host:port.
    #[arg(long, default_value = "127.0.0.1:2000")]
    address: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut stream = TcpStream::connect(&cli.address)?;
    stream.set_nodelay(true)?;

    let mut rl = DefaultEditor::new()?;
    println!("Connected to {}. Ctrl-D to exit.", cli.address);

    loop {
        let prompt = format!("{}> ", cli.address);
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let args: Vec<&str> = split_args(trimmed);
                if args.is_empty() {
                    continue;
                }

                let request = Frame::array(args.iter().map(|a| Frame::bulk(*a)).collect());
                stream.write_all(&request.serialize())?;

                match read_reply(&mut stream)? {
                    Some(frame) => print_frame(&frame),
                    None => {
                        println!("(connection closed)");
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

fn split_args(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Blocks on the socket until one complete reply frame arrives, or the
/// peer closes the connection.
fn read_reply(stream: &mut TcpStream) -> anyhow::Result<Option<Frame>> {
    let mut parser = RespParser::new();
    let mut buf = [0u8; 4096];

    loop {
        if let Some(frame) = parser.next_frame().map_err(anyhow::Error::msg)? {
            return Ok(Some(frame));
        }
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        parser.feed(&buf[..n]);
    }
}

fn print_frame(frame: &Frame) {
    match frame {
        Frame::Simple(s) => println!("{}", String::from_utf8_lossy(s)),
        Frame::Error(e) => println!("(error) {}", String::from_utf8_lossy(e)),
        Frame::Integer(n) => println!("(integer) {n}"),
        Frame::Bulk(None) => println!("(nil)"),
        Frame::Bulk(Some(b)) => println!("\"{}\"", String::from_utf8_lossy(b)),
        Frame::Array(None) => println!("(nil)"),
        Frame::Array(Some(items)) => {
            if items.is_empty() {
                println!("(empty array)");
            }
            for (i, item) in items.iter().enumerate() {
                print!("{}) ", i + 1);
                print_frame(item);
            }
        }
    }
}
