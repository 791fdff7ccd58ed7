// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#[cfg(test)]
mod harness_tests {
    use crate::frame::{FrameReader, RESET_SEQUENCE};
    use crate::workload::{BufferCopy, BufferInit, CountedLoop, UnrolledIncrement};
    use crate::{
        Command, Harness, Outcome, SerialPort, SimpleSerial, State, StatusIndicator,
        TransportError, TriggerLine, Verdict, Workload,
    };
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Tx(u8),
        TriggerHigh,
        TriggerLow,
        Run,
        Ok(u32),
        Error(u32),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    struct ScriptedPort {
        rx: VecDeque<Result<u8, TransportError>>,
        log: Log,
        fail_writes: Rc<Cell<bool>>,
    }

    impl SerialPort for ScriptedPort {
        fn read_byte(&mut self) -> Result<u8, TransportError> {
            self.rx.pop_front().unwrap_or(Err(TransportError::Closed))
        }

        fn write_byte(&mut self, byte: u8) -> Result<(), TransportError> {
            if self.fail_writes.get() {
                return Err(TransportError::Closed);
            }
            self.log.borrow_mut().push(Event::Tx(byte));
            Ok(())
        }
    }

    struct RecordingTrigger(Log);

    impl TriggerLine for RecordingTrigger {
        fn set_high(&mut self) {
            self.0.borrow_mut().push(Event::TriggerHigh);
        }

        fn set_low(&mut self) {
            self.0.borrow_mut().push(Event::TriggerLow);
        }
    }

    struct RecordingIndicator(Log);

    impl StatusIndicator for RecordingIndicator {
        fn ok(&mut self, status: u32) {
            self.0.borrow_mut().push(Event::Ok(status));
        }

        fn error(&mut self, status: u32) {
            self.0.borrow_mut().push(Event::Error(status));
        }
    }

    /// Logs every run, and optionally loses `skipped` increments the way a
    /// glitched counter would.
    struct Recorded<W> {
        inner: W,
        log: Log,
        skipped: u32,
    }

    impl<W: Workload<Observed = u32>> Workload for Recorded<W> {
        type Observed = u32;
        const FAULT_PAYLOAD_LEN: usize = W::FAULT_PAYLOAD_LEN;

        fn prepare(&mut self) {
            self.inner.prepare();
        }

        fn run(&mut self) -> u32 {
            self.log.borrow_mut().push(Event::Run);
            self.inner.run().wrapping_sub(self.skipped)
        }

        fn evaluate(&self, observed: u32) -> Verdict<'_> {
            self.inner.evaluate(observed)
        }
    }

    /// Buffer copy whose destination gets one byte flipped after the copy.
    struct CorruptedCopy<const N: usize> {
        inner: BufferCopy<N>,
        index: usize,
        log: Log,
    }

    impl<const N: usize> Workload for CorruptedCopy<N> {
        type Observed = ();
        const FAULT_PAYLOAD_LEN: usize = N;

        fn prepare(&mut self) {
            self.inner.prepare();
        }

        fn run(&mut self) {
            self.log.borrow_mut().push(Event::Run);
            self.inner.run();
            self.inner.destination_mut()[self.index] ^= 0xFF;
        }

        fn evaluate(&self, observed: ()) -> Verdict<'_> {
            self.inner.evaluate(observed)
        }
    }

    struct Rig {
        log: Log,
        fail_writes: Rc<Cell<bool>>,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                log: Rc::default(),
                fail_writes: Rc::default(),
            }
        }

        fn port(&self, input: &[u8]) -> ScriptedPort {
            ScriptedPort {
                rx: input.iter().copied().map(Ok).collect(),
                log: self.log.clone(),
                fail_writes: self.fail_writes.clone(),
            }
        }

        fn trigger(&self) -> RecordingTrigger {
            RecordingTrigger(self.log.clone())
        }

        fn recorded<W>(&self, inner: W, skipped: u32) -> Recorded<W> {
            Recorded {
                inner,
                log: self.log.clone(),
                skipped,
            }
        }

        fn events(&self) -> Vec<Event> {
            self.log.borrow().clone()
        }

        fn tx(&self) -> Vec<u8> {
            self.log
                .borrow()
                .iter()
                .filter_map(|event| match event {
                    Event::Tx(byte) => Some(*byte),
                    _ => None,
                })
                .collect()
        }

        fn clear(&self) {
            self.log.borrow_mut().clear();
        }

        /// Decodes everything the target sent into `(cmd, payload)` pairs.
        fn packets(&self) -> Vec<(u8, Vec<u8>)> {
            let mut reader = FrameReader::<80>::new();
            let mut packets = Vec::new();
            for byte in self.tx() {
                if reader.push(byte) {
                    let frame = reader.frame().unwrap();
                    packets.push((frame.cmd, frame.payload.to_vec()));
                }
            }
            packets
        }
    }

    fn assert_quiet_trigger_window(events: &[Event]) {
        let mut high = false;
        for event in events {
            match event {
                Event::TriggerHigh => high = true,
                Event::TriggerLow => high = false,
                Event::Tx(byte) => assert!(!high, "byte {byte:#04x} sent with trigger high"),
                Event::Ok(_) | Event::Error(_) => assert!(!high, "indicator driven with trigger high"),
                Event::Run => assert!(high, "workload ran outside the trigger window"),
            }
        }
        assert!(!high, "trigger left high");
    }

    fn booted<C, T, W, I>(harness: &mut Harness<C, T, W, I>)
    where
        C: crate::PacketChannel,
        T: TriggerLine,
        W: Workload,
        I: StatusIndicator,
    {
        assert_eq!(harness.state(), State::Boot);
        assert_eq!(harness.step(), None);
        assert_eq!(harness.state(), State::Idle);
    }

    #[test]
    fn test_boot_drives_trigger_low_then_sends_reset_marker() {
        let rig = Rig::new();
        let mut harness = Harness::new(
            SimpleSerial::<_, 8>::new(rig.port(&[])),
            rig.trigger(),
            CountedLoop::<1, 1>::new(),
        );
        booted(&mut harness);

        let events = rig.events();
        assert_eq!(events[0], Event::TriggerLow);
        assert_eq!(rig.tx(), RESET_SEQUENCE);
    }

    #[test]
    fn test_counted_loop_cycle_scenario() {
        let rig = Rig::new();
        let workload = rig.recorded(CountedLoop::<500, 500>::new(), 0);
        let mut harness = Harness::new(
            SimpleSerial::<_, 8>::new(rig.port(&[b's', 0x00])),
            rig.trigger(),
            workload,
        );
        booted(&mut harness);
        rig.clear();

        assert_eq!(harness.run_cycle(), Some(Outcome::Expected));
        assert_eq!(harness.state(), State::Idle);
        assert_eq!(harness.cycles(), 1);
        assert_eq!(
            rig.events(),
            vec![
                Event::Tx(b's'),
                Event::Tx(0x00),
                Event::TriggerHigh,
                Event::Run,
                Event::TriggerLow,
                Event::Tx(b'e'),
                Event::Tx(0x00),
            ]
        );
    }

    #[test]
    fn test_skipped_increments_produce_fault_packet() {
        let rig = Rig::new();
        let workload = rig.recorded(CountedLoop::<500, 500>::new(), 37);
        let mut harness = Harness::new(
            SimpleSerial::<_, 8>::new(rig.port(&[b's', 0x00])),
            rig.trigger(),
            workload,
        );
        booted(&mut harness);
        rig.clear();

        assert_eq!(harness.run_cycle(), Some(Outcome::Fault));
        // 249963 = 0x0003D06B, little-endian, COBS-stuffed, CRC 0x27.
        assert_eq!(
            rig.tx(),
            vec![b's', 0x00, b'f', 0x04, 0x6B, 0xD0, 0x03, 0x02, 0x27, 0x00]
        );
        assert_quiet_trigger_window(&rig.events());
    }

    #[test]
    fn test_idle_ignores_noise_and_still_serves_start() {
        let rig = Rig::new();
        let mut input = Vec::new();
        input.extend([b'x', 0x00]); // unknown command
        input.push(0x00); // empty frame
        input.extend([b'e', 0x00]); // host never sends responses
        input.extend([b's', 0x03, 0x11, 0x55, 0x00]); // bad crc
        input.extend([b'k'; 40]); // runs past the receive buffer
        input.push(0x00);
        input.extend([b's', 0x00]);

        let workload = rig.recorded(CountedLoop::<10, 10>::new(), 0);
        let mut harness = Harness::new(
            SimpleSerial::<_, 8>::new(rig.port(&input)),
            rig.trigger(),
            workload,
        );
        booted(&mut harness);
        rig.clear();

        for _ in 0..5 {
            assert_eq!(harness.run_cycle(), None);
            assert_eq!(harness.state(), State::Idle);
        }
        assert!(rig.events().is_empty(), "noise must not produce output");

        assert_eq!(harness.run_cycle(), Some(Outcome::Expected));
        assert_eq!(rig.tx(), vec![b's', 0x00, b'e', 0x00]);

        // Input exhausted: the port reports closed, the harness just idles.
        assert_eq!(harness.run_cycle(), None);
        assert_eq!(harness.cycles(), 1);
    }

    #[test]
    fn test_transport_error_mid_frame_is_discarded() {
        let rig = Rig::new();
        let mut port = rig.port(&[b's']);
        port.rx.push_back(Err(TransportError::Noise));
        port.rx.extend([Ok(0x00), Ok(b's'), Ok(0x00)]);

        let mut harness = Harness::new(
            SimpleSerial::<_, 8>::new(port),
            rig.trigger(),
            CountedLoop::<2, 2>::new(),
        );
        booted(&mut harness);
        rig.clear();

        assert_eq!(harness.run_cycle(), None); // transport error
        assert_eq!(harness.run_cycle(), None); // empty frame left behind
        assert_eq!(harness.run_cycle(), Some(Outcome::Expected));
    }

    #[test]
    fn test_one_execution_per_start_command() {
        let rig = Rig::new();
        let workload = rig.recorded(CountedLoop::<3, 3>::new(), 0);
        let mut harness = Harness::new(
            SimpleSerial::<_, 8>::new(rig.port(&[b's', 0x00, b's', 0x00])),
            rig.trigger(),
            workload,
        );
        booted(&mut harness);

        assert_eq!(harness.run_cycle(), Some(Outcome::Expected));
        assert_eq!(harness.run_cycle(), Some(Outcome::Expected));
        assert_eq!(harness.run_cycle(), None);

        let runs = rig.events().iter().filter(|e| **e == Event::Run).count();
        assert_eq!(runs, 2);
        assert_eq!(harness.cycles(), 2);
        assert_quiet_trigger_window(&rig.events());
    }

    #[test]
    fn test_failed_ack_skips_the_workload() {
        let rig = Rig::new();
        let workload = rig.recorded(CountedLoop::<3, 3>::new(), 0);
        let mut harness = Harness::new(
            SimpleSerial::<_, 8>::new(rig.port(&[b's', 0x00])),
            rig.trigger(),
            workload,
        );
        booted(&mut harness);
        rig.clear();
        rig.fail_writes.set(true);

        assert_eq!(harness.step(), None);
        assert_eq!(harness.state(), State::Armed);
        assert_eq!(harness.step(), None);
        assert_eq!(harness.state(), State::Idle);
        assert!(rig.events().is_empty());
        assert_eq!(harness.cycles(), 0);
    }

    #[test]
    fn test_step_walks_every_state() {
        let rig = Rig::new();
        let mut harness = Harness::new(
            SimpleSerial::<_, 8>::new(rig.port(&[b's', 0x00])),
            rig.trigger(),
            UnrolledIncrement::<1000>::new(),
        );
        let mut seen = vec![harness.state()];
        let mut outcome = None;
        while outcome.is_none() {
            outcome = harness.step();
            seen.push(harness.state());
        }
        assert_eq!(
            seen,
            vec![State::Boot, State::Idle, State::Armed, State::Executing, State::Idle]
        );
        assert_eq!(outcome, Some(Outcome::Expected));
    }

    #[test]
    fn test_buffer_copy_fault_carries_full_destination() {
        let rig = Rig::new();
        let workload = CorruptedCopy {
            inner: BufferCopy::<68>::new(BufferInit::Fill(0xAA), BufferInit::Fill(0xBB)),
            index: 13,
            log: rig.log.clone(),
        };
        let mut harness = Harness::new(
            SimpleSerial::<_, 69>::new(rig.port(&[b's', 0x00])),
            rig.trigger(),
            workload,
        );
        booted(&mut harness);
        rig.clear();

        assert_eq!(harness.run_cycle(), Some(Outcome::Fault));

        let events = rig.events();
        assert_eq!(
            &events[..5],
            &[
                Event::Tx(b's'),
                Event::Tx(0x00),
                Event::TriggerHigh,
                Event::Run,
                Event::TriggerLow,
            ]
        );
        assert_quiet_trigger_window(&events);

        let mut expected = vec![0xAA; 68];
        expected[13] = 0x55;
        assert_eq!(
            rig.packets(),
            vec![(b's', Vec::new()), (Command::Fault.byte(), expected)]
        );
    }

    #[test]
    fn test_unrolled_cycle_is_bracketed() {
        let rig = Rig::new();
        let workload = rig.recorded(UnrolledIncrement::<10000>::new(), 0);
        let mut trigger = rig.trigger();
        let mut harness = Harness::new(
            SimpleSerial::<_, 8>::new(rig.port(&[b's', 0x00])),
            &mut trigger,
            workload,
        );
        booted(&mut harness);
        rig.clear();

        assert_eq!(harness.run_cycle(), Some(Outcome::Expected));
        assert_eq!(
            rig.events(),
            vec![
                Event::Tx(b's'),
                Event::Tx(0x00),
                Event::TriggerHigh,
                Event::Run,
                Event::TriggerLow,
                Event::Tx(b'e'),
                Event::Tx(0x00),
            ]
        );
    }

    #[test]
    fn test_unrolled_divergence_reports_raw_register() {
        let rig = Rig::new();
        let workload = rig.recorded(UnrolledIncrement::<100>::new(), 3);
        let mut harness = Harness::new(
            SimpleSerial::<_, 8>::new(rig.port(&[b's', 0x00])),
            rig.trigger(),
            workload,
        );
        booted(&mut harness);
        rig.clear();

        assert_eq!(harness.run_cycle(), Some(Outcome::Fault));

        let events = rig.events();
        assert_eq!(
            &events[..5],
            &[
                Event::Tx(b's'),
                Event::Tx(0x00),
                Event::TriggerHigh,
                Event::Run,
                Event::TriggerLow,
            ]
        );
        assert_quiet_trigger_window(&events);
        assert_eq!(
            rig.packets(),
            vec![
                (b's', Vec::new()),
                (Command::Fault.byte(), 97u32.to_le_bytes().to_vec()),
            ]
        );
    }

    #[test]
    fn test_indicator_follows_response() {
        let rig = Rig::new();
        let workload = rig.recorded(CountedLoop::<4, 4>::new(), 1);
        let mut harness = Harness::with_indicator(
            SimpleSerial::<_, 8>::new(rig.port(&[b's', 0x00, b's', 0x00])),
            rig.trigger(),
            workload,
            RecordingIndicator(rig.log.clone()),
        );
        booted(&mut harness);
        rig.clear();

        assert_eq!(harness.run_cycle(), Some(Outcome::Fault));
        assert_eq!(harness.run_cycle(), Some(Outcome::Fault));

        let events = rig.events();
        let indicators: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, Event::Ok(_) | Event::Error(_)))
            .copied()
            .collect();
        assert_eq!(indicators, vec![Event::Error(0), Event::Error(1)]);
        assert_eq!(events.last(), Some(&Event::Error(1)));
        assert_quiet_trigger_window(&events);
    }
}
