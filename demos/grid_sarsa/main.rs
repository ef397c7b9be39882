use std::{error::Error, fs, path::Path};

use log::info;
use rand::thread_rng;
use strum::VariantArray;
use tdgrid::{
    env::DiscreteActionSpace,
    gym::{Action, GridWorld},
    RuleRun, TrainConfig,
};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = Path::new("demos/grid_sarsa/out");
    fs::create_dir_all(path)?;

    let config = TrainConfig::default();
    let env = GridWorld::new(config.grid.clone(), config.start, config.dynamics)?;
    let runs = tdgrid::compare_rules(&config, &mut thread_rng())?;

    // value table of each rule's final epoch, one column per action
    for RuleRun { rule, table, .. } in &runs {
        let mut wtr = csv::Writer::from_path(path.join(format!("values_{rule}.csv")))?;
        let mut header = vec!["row".to_owned(), "col".to_owned()];
        header.extend(env.actions().iter().map(Action::to_string));
        wtr.write_record(&header)?;
        for pos in table.cells() {
            let mut record = vec![pos.0.to_string(), pos.1.to_string()];
            for &action in Action::VARIANTS {
                record.push(format!("{:.4}", table.value(pos, action)?));
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
    }

    let mut wtr = csv::Writer::from_path(path.join("rewards.csv"))?;
    let mut header = vec!["episode".to_owned()];
    header.extend(runs.iter().map(|run| run.rule.to_string()));
    wtr.write_record(&header)?;
    for episode in 0..config.episodes as usize {
        let mut record = vec![episode.to_string()];
        record.extend(
            runs.iter()
                .map(|run| format!("{:.4}", run.curve.as_slice()[episode])),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush()?;

    info!("Wrote reward curves to {}", path.display());
    Ok(())
}
