use std::io::Write;

use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use vsearch_core::{ExperimentState, ObjectCount};
use vsearch_experiment::{
    Advance, ExperimentConfig, ExperimentError, ExperimentEvent, ExperimentStateMachine, RngSource,
    SequenceSource, StartSelection, TrialTable,
};
use vsearch_timing::ManualTimer;

const HEADER: &str = "DesignName,ParticipantID,TrialID,Block1,Block2,DT,OC,Practice\n";

fn table(rows: &str) -> TrialTable {
    let data = format!("{HEADER}{rows}");
    TrialTable::from_reader(data.as_bytes(), &Default::default()).unwrap()
}

fn seeded(
    table: TrialTable,
    timer: &ManualTimer,
) -> ExperimentStateMachine<ManualTimer, RngSource<StdRng>> {
    ExperimentStateMachine::new(
        table,
        ExperimentConfig::default(),
        timer.clone(),
        RngSource(StdRng::seed_from_u64(2024)),
    )
}

fn target(m: &ExperimentStateMachine<ManualTimer, impl vsearch_experiment::RandomSource>) -> usize {
    m.layout().expect("layout on screen").target_index
}

fn wrong(m: &ExperimentStateMachine<ManualTimer, impl vsearch_experiment::RandomSource>) -> usize {
    (target(m) + 1) % m.layout().unwrap().len()
}

#[test]
fn two_rows_in_one_set_show_instructions_once() {
    let timer = ManualTimer::new(0);
    let mut m = seeded(
        table("VS,P1,1,1,1,Size,Low,false\nVS,P1,2,1,1,Size,Low,false\n"),
        &timer,
    );

    assert_eq!(m.start("P1", 1, 1).unwrap(), Advance::Instructions);
    assert_eq!(m.state(), ExperimentState::Instructions);

    assert!(m.handle_event(ExperimentEvent::EnterPressed));
    assert_eq!(m.state(), ExperimentState::Shapes);

    timer.advance(640);
    assert!(m.handle_event(ExperimentEvent::SpacePressed));
    timer.advance(210);
    let hit = target(&m);
    assert!(m.handle_event(ExperimentEvent::PlaceholderClicked(hit)));

    assert_eq!(m.log().len(), 1);
    assert_eq!(m.log().records()[0].response_time_ms, 850);
    assert_eq!(m.log().records()[0].error_count, 0);
    assert_eq!(m.current_index(), Some(1));
    assert_eq!(m.state(), ExperimentState::Shapes);
}

#[test]
fn single_row_table_finishes_and_ignores_further_input() {
    let timer = ManualTimer::new(0);
    let mut m = seeded(table("VS,P1,1,1,1,Opacity,Medium,false\n"), &timer);

    m.start("P1", 1, 1).unwrap();
    m.handle_event(ExperimentEvent::EnterPressed);
    m.handle_event(ExperimentEvent::SpacePressed);
    let hit = target(&m);
    assert!(m.handle_event(ExperimentEvent::PlaceholderClicked(hit)));

    assert!(m.is_finished());
    assert_eq!(m.state(), ExperimentState::Finished);
    assert_eq!(m.current_index(), None);

    for event in [
        ExperimentEvent::EnterPressed,
        ExperimentEvent::SpacePressed,
        ExperimentEvent::PlaceholderClicked(0),
    ] {
        assert!(!m.handle_event(event));
    }
    assert_eq!(m.advance(), Advance::Finished);
    assert_eq!(m.state(), ExperimentState::Finished);
    assert_eq!(m.log().len(), 1);
}

#[test]
fn wrong_clicks_retry_the_same_trial_with_a_new_layout() {
    let timer = ManualTimer::new(0);
    let mut m = seeded(table("VS,P1,1,1,1,SizeOpacity,High,false\n"), &timer);
    m.start("P1", 1, 1).unwrap();
    m.handle_event(ExperimentEvent::EnterPressed);

    let params = m.parameters().cloned();
    let mut layouts = vec![m.layout().cloned().unwrap()];

    for attempt in 1..=3 {
        m.handle_event(ExperimentEvent::SpacePressed);
        let miss = wrong(&m);
        assert!(m.handle_event(ExperimentEvent::PlaceholderClicked(miss)));

        assert_eq!(m.state(), ExperimentState::Shapes);
        assert_eq!(m.current_index(), Some(0));
        assert_eq!(m.parameters().cloned(), params);
        assert_eq!(m.error_count(), attempt);
        assert!(m.log().is_empty());
        layouts.push(m.layout().cloned().unwrap());
    }
    assert!(layouts.windows(2).any(|w| w[0] != w[1]));
    assert!(layouts.iter().all(|l| l.len() == ObjectCount::High.count()));

    m.handle_event(ExperimentEvent::SpacePressed);
    let hit = target(&m);
    m.handle_event(ExperimentEvent::PlaceholderClicked(hit));
    assert_eq!(m.log().records()[0].error_count, 3);
}

#[test]
fn logged_error_count_is_the_session_running_total() {
    let timer = ManualTimer::new(0);
    let mut m = seeded(
        table("VS,P1,1,1,1,Size,Low,false\nVS,P1,2,1,1,Size,Low,false\n"),
        &timer,
    );
    m.start("P1", 1, 1).unwrap();
    m.handle_event(ExperimentEvent::EnterPressed);

    m.handle_event(ExperimentEvent::SpacePressed);
    let miss = wrong(&m);
    m.handle_event(ExperimentEvent::PlaceholderClicked(miss));
    m.handle_event(ExperimentEvent::SpacePressed);
    let hit = target(&m);
    m.handle_event(ExperimentEvent::PlaceholderClicked(hit));

    m.handle_event(ExperimentEvent::SpacePressed);
    let hit = target(&m);
    m.handle_event(ExperimentEvent::PlaceholderClicked(hit));

    assert!(m.is_finished());
    let logged: Vec<u32> = m.log().records().iter().map(|r| r.error_count).collect();
    assert_eq!(logged, vec![1, 1]);

    m.start("P1", 1, 1).unwrap();
    assert_eq!(m.error_count(), 0);
}

#[test]
fn response_time_starts_at_shapes_not_placeholders() {
    let timer = ManualTimer::new(5_000);
    let mut m = ExperimentStateMachine::new(
        table("VS,P1,1,1,1,Size,Low,false\nVS,P1,2,1,1,Size,Low,false\n"),
        ExperimentConfig::default(),
        timer.clone(),
        SequenceSource::new(vec![0.7, 0.3], vec![0, 0, 0, 0, 0, 0, 0, 5]),
    );
    m.start("P1", 1, 1).unwrap();
    timer.advance(10_000);
    m.handle_event(ExperimentEvent::EnterPressed);

    timer.advance(1_000);
    m.handle_event(ExperimentEvent::SpacePressed);
    timer.advance(400);
    assert_eq!(m.layout().unwrap().target_index, 5);
    m.handle_event(ExperimentEvent::PlaceholderClicked(5));

    assert_eq!(m.log().records()[0].response_time_ms, 1_400);
}

#[test]
fn failed_retry_timer_restarts_with_new_shapes() {
    let timer = ManualTimer::new(0);
    let mut m = seeded(table("VS,P1,1,1,1,Size,Low,false\n"), &timer);
    m.start("P1", 1, 1).unwrap();
    m.handle_event(ExperimentEvent::EnterPressed);
    timer.advance(300);
    m.handle_event(ExperimentEvent::SpacePressed);
    let miss = wrong(&m);
    m.handle_event(ExperimentEvent::PlaceholderClicked(miss));

    timer.advance(200);
    m.handle_event(ExperimentEvent::SpacePressed);
    timer.advance(100);
    let hit = target(&m);
    m.handle_event(ExperimentEvent::PlaceholderClicked(hit));

    let outcome = &m.log().records()[0];
    assert_eq!(outcome.response_time_ms, 300);
    assert_eq!(outcome.error_count, 1);
}

#[test]
fn session_stops_at_participant_boundary_and_set_changes_prompt_again() {
    let timer = ManualTimer::new(0);
    let rows = "\
VS,P1,1,1,1,Size,Low,true
VS,P1,2,1,1,Size,Low,true
VS,P1,3,1,2,Opacity,Low,false
VS,P1,4,1,2,Opacity,Medium,false
VS,P2,1,1,1,Size,Low,true
";
    let mut m = seeded(table(rows), &timer);
    let mut steps = vec![m.start("P1", 1, 1).unwrap()];

    while !m.is_finished() {
        if m.state() == ExperimentState::Instructions {
            m.handle_event(ExperimentEvent::EnterPressed);
        }
        m.handle_event(ExperimentEvent::SpacePressed);
        let hit = target(&m);
        let before = m.log().len();
        m.handle_event(ExperimentEvent::PlaceholderClicked(hit));
        assert_eq!(m.log().len(), before + 1);
        steps.push(match m.state() {
            ExperimentState::Instructions => Advance::Instructions,
            ExperimentState::Shapes => Advance::Shapes,
            _ => Advance::Finished,
        });
    }

    assert_eq!(
        steps,
        vec![
            Advance::Instructions,
            Advance::Shapes,
            Advance::Instructions,
            Advance::Instructions,
            Advance::Finished,
        ]
    );
    let trial_ids: Vec<&str> = m.log().records().iter().map(|r| r.trial_id.as_str()).collect();
    assert_eq!(trial_ids, vec!["1", "2", "3", "4"]);
}

#[test]
fn starting_mid_table_skips_earlier_rows() {
    let timer = ManualTimer::new(0);
    let rows = "\
VS,P1,1,1,1,Size,Low,true
VS,P1,2,2,1,Size,Low,false
VS,P1,3,2,1,Size,Low,false
";
    let mut m = seeded(table(rows), &timer);
    assert_eq!(m.start("P1", 2, 1).unwrap(), Advance::Instructions);
    assert_eq!(m.current_index(), Some(1));
    assert_eq!(m.current_row().unwrap().trial_id, "2");
}

#[test]
fn missing_start_row_is_reported() {
    let timer = ManualTimer::new(0);
    let mut m = seeded(table("VS,P1,1,1,1,Size,Low,true\n"), &timer);
    match m.start("P2", 1, 1) {
        Err(ExperimentError::NoMatchingStartRow { participant, .. }) => {
            assert_eq!(participant, "P2")
        }
        other => panic!("expected NoMatchingStartRow, got {other:?}"),
    }
    assert_eq!(m.state(), ExperimentState::Idle);
}

#[test]
fn design_file_to_exported_log() {
    let dir = tempfile::tempdir().unwrap();
    let design_path = dir.path().join("design_data.csv");
    let mut file = std::fs::File::create(&design_path).unwrap();
    write!(
        file,
        "{HEADER}VS,P3,11,1,1,Size,Low,false\nVS,P3,12,1,1,Size,Low,false\n"
    )
    .unwrap();
    drop(file);

    let config = ExperimentConfig::default();
    let table = TrialTable::from_path(&design_path, &config.design).unwrap();
    let selection = StartSelection::new(&table);
    let (participant, block, trial) = selection.choice().unwrap();
    let participant = participant.to_string();

    let timer = ManualTimer::new(0);
    let mut m = seeded(table, &timer);
    m.start(&participant, block, trial).unwrap();
    while !m.is_finished() {
        m.handle_event(ExperimentEvent::EnterPressed);
        timer.advance(500);
        m.handle_event(ExperimentEvent::SpacePressed);
        let hit = target(&m);
        m.handle_event(ExperimentEvent::PlaceholderClicked(hit));
    }

    let out = m.log().export(dir.path(), &participant, 42).unwrap();
    let text = std::fs::read_to_string(out).unwrap();
    assert_eq!(
        text,
        "DesignName,ParticipantID,TrialID,Block1,Block2,DT,OC,visualSearchTime,ErrorCount\r\n\
         VS,P3,11,1,1,Size,Low,500,0\r\n\
         VS,P3,12,1,1,Size,Low,500,0\r\n"
    );
}
