// tests/properties.rs

use std::path::Path;

use proptest::prelude::*;

use dedalus_cell::config::ConfigFile;
use dedalus_cell::exec::command::CommandBuilder;
use dedalus_cell::exec::script::render_wrapped;
use dedalus_cell::magic::RunConfiguration;
use dedalus_cell::types::MpiImplementation;

fn implementation() -> impl Strategy<Value = MpiImplementation> {
    prop_oneof![
        Just(MpiImplementation::OpenMpi),
        Just(MpiImplementation::Mpich),
    ]
}

proptest! {
    #[test]
    fn rank_flag_matches_input(
        ranks in 1u32..=100_000,
        info in any::<bool>(),
        time in any::<bool>(),
        implementation in implementation(),
    ) {
        let builder = CommandBuilder::from_config(&ConfigFile::default());
        let run = RunConfiguration::new(ranks, info, time).unwrap();
        let cmd = builder.launch_command(&run, implementation, Path::new("/tmp/s.py"));

        let argv = cmd.argv();
        let flag = argv.iter().rposition(|a| *a == "-n").unwrap();
        prop_assert_eq!(argv[flag + 1], ranks.to_string());
        prop_assert_eq!(argv[flag - 1], builder.launcher(implementation));
        prop_assert_eq!(*argv.last().unwrap(), "/tmp/s.py");

        // Same inputs, same vector.
        let again = builder.launch_command(&run, implementation, Path::new("/tmp/s.py"));
        prop_assert_eq!(cmd, again);
    }

    #[test]
    fn parsed_rank_count_round_trips(ranks in 1u32..=100_000, time in any::<bool>()) {
        let line = if time {
            format!("--time -np {ranks}")
        } else {
            format!("-np {ranks}")
        };
        let run = RunConfiguration::parse(&line).unwrap();
        prop_assert_eq!(run.rank_count(), ranks);
        prop_assert_eq!(run.time_mode, time);
    }

    #[test]
    fn rendering_is_deterministic(
        code in "[a-z_=() 0-9\n]{0,200}",
        time in any::<bool>(),
    ) {
        prop_assert_eq!(render_wrapped(&code, time), render_wrapped(&code, time));
    }

    #[test]
    fn timed_scripts_always_have_two_barriers(code in "[a-z_=() 0-9\n]{0,200}") {
        let script = render_wrapped(&code, true);
        prop_assert_eq!(script.matches("_comm.Barrier()").count(), 2);
        prop_assert_eq!(script.matches("if _rank == 0:").count(), 1);
    }
}
