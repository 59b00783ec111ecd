//! Subcommand implementations.

use anyhow::{bail, Context, Result};
use dorico_remote::{DoricoRemote, EventFilter, RemoteEvent};
use dorico_types::commands::{Command, CommandParameter};
use dorico_types::note::{Note, Spelling};

pub async fn info(remote: &DoricoRemote) -> Result<()> {
    let version = remote.get_app_info().await?;
    println!("Dorico {version}");
    Ok(())
}

pub async fn commands(remote: &DoricoRemote, filter: Option<&str>) -> Result<()> {
    let commands = remote.get_commands().await?;
    let needle = filter.map(str::to_lowercase);
    for info in commands.iter() {
        if needle
            .as_deref()
            .is_some_and(|n| !info.name.to_lowercase().contains(n))
        {
            continue;
        }
        if info.required_parameters.is_empty() {
            println!("{}", info.name);
        } else {
            println!("{} ({})", info.name, info.required_parameters.join(", "));
        }
    }
    Ok(())
}

pub async fn flows(remote: &DoricoRemote) -> Result<()> {
    let flows = remote.get_flows().await?;
    println!("score {}", flows.open_score_id);
    for flow in &flows.flows {
        println!("{:>4}  {}", flow.flow_id, flow.flow_name);
    }
    Ok(())
}

pub async fn layouts(remote: &DoricoRemote) -> Result<()> {
    let layouts = remote.get_layouts().await?;
    println!("score {}", layouts.open_score_id);
    for layout in &layouts.layouts {
        println!(
            "{:>4}  {:<12} {}",
            layout.layout_id, layout.layout_type, layout.layout_name
        );
    }
    Ok(())
}

pub async fn status(remote: &DoricoRemote) -> Result<()> {
    let status = remote.get_status().await?;
    println!("{status:#?}");
    Ok(())
}

pub async fn watch(remote: &DoricoRemote) -> Result<()> {
    let mut events = remote.subscribe(EventFilter::all());
    eprintln!("watching for events, Ctrl-C to stop");
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(RemoteEvent::Disconnected { code, reason }) => {
                    println!("disconnected (code {code:?}, reason {reason:?})");
                    return Ok(());
                }
                Some(event) => println!("{event:?}"),
                None => return Ok(()),
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                return Ok(());
            }
        }
    }
}

pub async fn command(remote: &DoricoRemote, name: &str, parameters: &[String]) -> Result<()> {
    let command = build_command(name, parameters)?;
    let code = remote.send_command(&command).await?;
    println!("{code}");
    Ok(())
}

pub fn print_note(text: &str, flats: bool) -> Result<()> {
    let spelling = if flats { Spelling::Flats } else { Spelling::Sharps };
    let note = parse_note(text, spelling)?;
    println!("note       {note}");
    println!("midi       {}", note.midi());
    println!("frequency  {:.2} Hz", note.frequency());
    println!("piano key  {}", note.piano_key());
    println!("organ key  {}", note.organ_key());
    println!("enharmonic {}", note.to_enharmonic()?);
    for command in note.note_commands() {
        println!("command    {}", command.command_string());
    }
    Ok(())
}

/// `Name` plus `P=V` arguments into a command.
fn build_command(name: &str, parameters: &[String]) -> Result<Command> {
    let mut command = Command::new(name);
    for parameter in parameters {
        let Some((key, value)) = parameter.split_once('=') else {
            bail!("parameter {parameter:?} is not Name=Value");
        };
        if key.is_empty() {
            bail!("parameter {parameter:?} has no name");
        }
        command.add_parameter(CommandParameter::new(key, value));
    }
    Ok(command)
}

/// A MIDI number (`61`) or a name with octave (`C#4`, `Bb-1`).
fn parse_note(text: &str, spelling: Spelling) -> Result<Note> {
    let text = text.trim();
    if let Ok(midi) = text.parse::<i32>() {
        return Ok(Note::from_midi(midi, spelling)?);
    }

    let split = text
        .char_indices()
        .skip(1)
        .find(|(_, c)| c.is_ascii_digit() || *c == '-')
        .map(|(i, _)| i)
        .with_context(|| format!("{text:?} has no octave"))?;
    let (name, octave) = text.split_at(split);
    let octave: i32 = octave
        .parse()
        .with_context(|| format!("invalid octave in {text:?}"))?;
    Ok(Note::from_name(name, octave)?)
}
