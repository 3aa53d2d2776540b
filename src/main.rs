use logicprop::*;
use std::error::Error;
use std::time::Duration;

const BITS: usize = 4;

/// Builds a johnson counter: a ring of registers with the last output inverted into the first.
fn johnson_counter(project: &Project, bits: usize) -> Result<CircuitDefinition> {
    let mut c = CircuitDefinition::new("johnson");
    let clk = c.add_net("clk", BitWidth::ONE)?;
    let clock = project.create_component("clock", &Attributes::new())?;
    c.place("clock", clock, &[clk])?;

    let qs = (0..bits)
        .map(|i| c.add_net(format!("q{}", i), BitWidth::ONE))
        .collect::<Result<Vec<NetId>>>()?;
    let feedback = c.add_net("feedback", BitWidth::ONE)?;
    if let Some(last) = qs.last() {
        c.not1("invert", *last, feedback)?;
    }

    for (i, q) in qs.iter().enumerate() {
        let d = if i == 0 { feedback } else { qs[i - 1] };
        let register = project.create_component("register", &Attributes::new())?;
        c.place(format!("r{}", i), register, &[d, clk, *q])?;
        c.output_pin(format!("out{}", i), *q)?;
    }
    Ok(c)
}

fn main() -> std::result::Result<(), Box<dyn Error>> {
    let dot = std::env::args().any(|arg| arg == "--dot");
    let config = SimConfig::default().with_tick_period(Duration::from_millis(250));
    let mut project = Project::new(config);
    let circuit = project.add_circuit(johnson_counter(&project, BITS)?)?;

    if dot {
        circuit.read(|c| c.dump_dot(&mut std::io::stdout()))?;
        return Ok(());
    }

    let mut sim = project.simulation("johnson")?;
    #[cfg(feature = "debug_probes")]
    sim.add_listener(ConsoleProbe::new((0..BITS).map(|i| format!("q{}", i))));

    let control = sim.control();
    ctrlc::set_handler(move || control.stop())?;

    colour::yellow_ln!("running `{}`, ctrl-c to stop", circuit.name());
    let ticks = sim.run(None)?;

    let state: Vec<String> = (0..BITS)
        .map(|i| sim.output(&format!("out{}", i)).map(|v| v.to_string()))
        .collect::<Result<_>>()?;
    colour::yellow_ln!("stopped after {} ticks at {}", ticks, state.join(""));
    Ok(())
}
