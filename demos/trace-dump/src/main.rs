use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context as _, Result};
use structopt::StructOpt;

use opentracedecode::condition::{ConditionSet, ConditionTerm};
use opentracedecode::decoder::{ChannelDef, Decoder};
use opentracedecode::error::Result as OtdResult;
use opentracedecode::instance::{Context, DecoderLogic, InitialPin};
use opentracedecode::output::{OutputType, Payload};
use opentracedecode::session::Session;

#[derive(StructOpt, Debug)]
#[structopt(
    about = "Feeds a raw single-channel sample file through a toy rising-edge annotator and prints the annotations it emits."
)]
struct Opt {
    #[structopt(name = "FILE", parse(from_os_str), help = "Raw sample file, one byte per sample, bit 0 is the channel.")]
    file: PathBuf,

    #[structopt(long, default_value = "64", help = "Feed the file to the session in chunks of this many samples.")]
    chunk: usize,
}

/// A toy decoder: emits one annotation every time channel 0 rises.
struct EdgeAnnotator {
    output: Option<Arc<opentracedecode::output::PdOutput>>,
}

impl DecoderLogic for EdgeAnnotator {
    fn decode(&mut self, ctx: &mut Context) -> OtdResult<()> {
        let output = self.output.clone().expect("output_new is called from start()");
        loop {
            let conditions = vec![ConditionSet::new(vec![ConditionTerm::EdgeRising(0)])];
            let result = match ctx.wait(conditions) {
                Ok(r) => r,
                Err(_) => return Ok(()),
            };
            ctx.put(
                result.samplenum,
                result.samplenum + 1,
                &output,
                Payload::Annotation { class_index: 0, strings: vec!["rising edge".into()] },
            )?;
        }
    }

    fn start(&mut self, ctx: &mut Context) -> OtdResult<()> {
        self.output = Some(ctx.output_new(OutputType::Ann, "edges"));
        Ok(())
    }
}

fn toy_decoder() -> Decoder {
    Decoder {
        id: "edges".into(),
        name: "edges".into(),
        longname: "Rising-edge annotator".into(),
        desc: "Annotates every rising edge on channel 0".into(),
        license: "MIT".into(),
        inputs: vec!["logic".into()],
        outputs: vec!["edges".into()],
        tags: vec!["Util".into()],
        channels: vec![ChannelDef::new("data", "DATA", "the channel to watch", 0)],
        optional_channels: vec![],
        options: vec![],
        annotations: vec![],
        annotation_rows: vec![],
        binary: vec![],
        logic_output_channels: vec![],
        api_version: 3,
    }
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let mut bytes = Vec::new();
    File::open(&opt.file).context("failed to open sample file")?.read_to_end(&mut bytes).context("failed to read sample file")?;

    let count = Arc::new(Mutex::new(0u64));
    let session = Session::new();
    session.pd_output_callback_add(
        OutputType::Ann,
        Arc::new({
            let count = count.clone();
            move |datum| {
                if let Payload::Annotation { strings, .. } = &datum.payload {
                    println!("sample {}: {}", datum.start_sample, strings.join(" "));
                    *count.lock().unwrap() += 1;
                }
            }
        }),
    )?;

    let inst = session.inst_new(Arc::new(toy_decoder()), Default::default(), Box::new(EdgeAnnotator { output: None }))?;
    inst.channel_set_all(vec![Some(0)])?;
    inst.initial_pins_set_all(vec![InitialPin::Low])?;

    session.start()?;

    let mut abs = 0u64;
    for chunk in bytes.chunks(opt.chunk.max(1)) {
        let data: Arc<[u8]> = Arc::from(chunk.to_vec());
        let buf = opentracedecode::buffer::SampleBuffer::new(abs, abs + chunk.len() as u64, data, 1)?;
        session.send(buf)?;
        abs += chunk.len() as u64;
    }
    session.send_eof()?;
    session.terminate_reset()?;

    println!("total rising edges: {}", *count.lock().unwrap());

    Ok(())
}
