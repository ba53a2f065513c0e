//! Baud rate negotiation
//!
//! The programmer keeps whatever rate it was last switched to, so the
//! host cannot assume it matches the configured rate. Negotiation:
//!
//! 1. Send cancel at the configured rate. A prompt means we are done.
//! 2. Otherwise probe each supported rate in ascending order with up to
//!    [`PROBE_RETRIES`] cancels until one answers with a prompt.
//! 3. If that rate is not the configured one, send the switch command,
//!    move the local side to the configured rate and wait for a prompt.
//! 4. Go back to 1, at most `max_attempts` times.

use std::io::Write;

use epp2_core::{BaudRate, Transport};

use crate::channel::{CommandChannel, Sink};
use crate::error::{Result, SessionError};
use crate::protocol::*;

/// Where the negotiation currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Local and remote rates not known to match
    Unsynced,
    /// Searching for the programmer's current rate
    ProbingRate,
    /// The programmer answers at this rate
    Confirmed(BaudRate),
}

/// Result of a successful negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiation {
    /// Rate both sides now use
    pub baud: BaudRate,
    /// Rate the programmer was found at, if probing was needed
    pub found_at: Option<BaudRate>,
    /// Probe-and-switch rounds performed
    pub rounds: u32,
    /// Prompt waits that gave up
    pub prompt_timeouts: u32,
}

/// Brings the programmer and the local line to the same baud rate
#[derive(Debug, Clone)]
pub struct BaudNegotiator {
    target: BaudRate,
    max_attempts: u32,
    state: NegotiationState,
}

impl BaudNegotiator {
    pub fn new(target: BaudRate, max_attempts: u32) -> Self {
        Self {
            target,
            max_attempts,
            state: NegotiationState::Unsynced,
        }
    }

    pub fn target(&self) -> BaudRate {
        self.target
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Run the negotiation to completion
    ///
    /// Fails with [`SessionError::SyncFailed`] once `max_attempts`
    /// probe-and-switch rounds have not produced a prompt at the target
    /// rate.
    pub fn run<T: Transport, D: Write>(
        &mut self,
        channel: &mut CommandChannel<T, D>,
    ) -> Result<Negotiation> {
        let mut result = Negotiation {
            baud: self.target,
            found_at: None,
            rounds: 0,
            prompt_timeouts: 0,
        };

        loop {
            self.state = NegotiationState::Unsynced;
            if self.check_prompt(channel)? {
                self.state = NegotiationState::Confirmed(self.target);
                log::info!("Programmer ready at {} baud", self.target);
                return Ok(result);
            }

            if result.rounds == self.max_attempts {
                return Err(SessionError::SyncFailed {
                    attempts: result.rounds,
                });
            }
            result.rounds += 1;

            log::info!("Set EPP-2 baud: {}", self.target);
            self.state = NegotiationState::ProbingRate;
            let Some(current) = self.probe(channel)? else {
                log::warn!("No prompt at any supported baud rate");
                continue;
            };
            result.found_at = Some(current);

            if current != self.target {
                self.switch(channel)?;
                if !channel.wait_for_prompt()? {
                    result.prompt_timeouts += 1;
                }
            }
        }
    }

    /// Cancel at the target rate and see whether a prompt comes back
    fn check_prompt<T: Transport, D: Write>(
        &mut self,
        channel: &mut CommandChannel<T, D>,
    ) -> Result<bool> {
        if channel.transport().baud() != self.target {
            channel.transport_mut().set_baud(self.target)?;
        }
        log::debug!("Check for command prompt");
        channel.send(CANCEL, false)?;
        channel.settle();
        Ok(channel.receive(REPLY_TICKS, Sink::Diagnostic)?.is_prompt())
    }

    /// Find the rate the programmer currently answers at
    pub fn probe<T: Transport, D: Write>(
        &mut self,
        channel: &mut CommandChannel<T, D>,
    ) -> Result<Option<BaudRate>> {
        self.state = NegotiationState::ProbingRate;

        for rate in BaudRate::ALL {
            channel.transport_mut().set_baud(rate)?;
            for _ in 0..PROBE_RETRIES {
                channel.send(CANCEL, true)?;
                if channel.receive(PROBE_TICKS, Sink::Silent)?.is_prompt() {
                    log::info!("Current baud rate: {}", rate);
                    self.state = NegotiationState::Confirmed(rate);
                    return Ok(Some(rate));
                }
            }
            log::debug!("No answer at {} baud", rate);
        }

        Ok(None)
    }

    /// Tell the programmer to change rate, then follow locally
    fn switch<T: Transport, D: Write>(&mut self, channel: &mut CommandChannel<T, D>) -> Result<()> {
        channel.send(self.target.switch_command(), false)?;
        channel.settle();
        channel.transport_mut().set_baud(self.target)?;
        self.state = NegotiationState::Unsynced;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epp2_dummy::{DummyConfig, DummyProgrammer};

    fn channel_for(
        device: BaudRate,
        target: BaudRate,
    ) -> CommandChannel<DummyProgrammer, Vec<u8>> {
        let dummy = DummyProgrammer::new(
            DummyConfig {
                baud: device,
                ..Default::default()
            },
            target,
        );
        CommandChannel::new(dummy, Vec::new(), Timing::instant())
    }

    #[test]
    fn test_already_in_sync() {
        let mut ch = channel_for(BaudRate::B19200, BaudRate::B19200);
        let mut negotiator = BaudNegotiator::new(BaudRate::B19200, 3);

        let result = negotiator.run(&mut ch).unwrap();
        assert_eq!(result.rounds, 0);
        assert_eq!(result.found_at, None);
        assert!(ch.transport().baud_changes().is_empty());
        assert_eq!(
            negotiator.state(),
            NegotiationState::Confirmed(BaudRate::B19200)
        );
    }

    #[test]
    fn test_device_at_300_target_9600() {
        let mut ch = channel_for(BaudRate::B300, BaudRate::B9600);
        let mut negotiator = BaudNegotiator::new(BaudRate::B9600, 3);

        let result = negotiator.run(&mut ch).unwrap();
        assert_eq!(result.found_at, Some(BaudRate::B300));
        assert_eq!(result.rounds, 1);
        assert_eq!(result.prompt_timeouts, 0);

        let dummy = ch.transport();
        assert_eq!(dummy.baud_changes(), &[BaudRate::B300, BaudRate::B9600]);
        assert_eq!(dummy.device_baud(), BaudRate::B9600);
        // probe cancel at 300, switch, prompt nudge and final check at 9600
        assert_eq!(
            dummy.commands(),
            &[
                "\x1B".to_string(),
                "1X".to_string(),
                String::new(),
                "\x1B".to_string()
            ]
        );

        let diag = String::from_utf8(ch.diagnostics().clone()).unwrap();
        assert!(diag.contains(">1X\n"));
        assert!(diag.starts_with(">~\n"));
    }

    #[test]
    fn test_converges_from_every_rate() {
        for device in BaudRate::ALL {
            for target in BaudRate::ALL {
                let mut ch = channel_for(device, target);
                let mut negotiator = BaudNegotiator::new(target, 2);
                let result = negotiator.run(&mut ch).unwrap();

                assert_eq!(result.baud, target);
                assert_eq!(ch.transport().device_baud(), target);

                if device == target {
                    assert!(ch.transport().baud_changes().is_empty());
                    continue;
                }

                // every rate up to the device's own is tried, in order
                let mut expected: Vec<BaudRate> =
                    BaudRate::ALL.iter().copied().take_while(|&b| b <= device).collect();
                expected.push(target);
                assert_eq!(ch.transport().baud_changes(), &expected[..]);

                let switches: Vec<&String> = ch
                    .transport()
                    .commands()
                    .iter()
                    .filter(|c| c.ends_with('X'))
                    .collect();
                assert_eq!(switches, vec![target.switch_command()]);
            }
        }
    }

    #[test]
    fn test_mute_device_fails_after_bounded_attempts() {
        let dummy = DummyProgrammer::new(
            DummyConfig {
                mute: true,
                ..Default::default()
            },
            BaudRate::B9600,
        );
        let mut ch = CommandChannel::new(dummy, Vec::new(), Timing::instant());
        let mut negotiator = BaudNegotiator::new(BaudRate::B9600, 2);

        let err = negotiator.run(&mut ch).unwrap_err();
        assert!(matches!(err, SessionError::SyncFailed { attempts: 2 }));
        // two full probe sweeps, each followed by a return to the target rate
        assert_eq!(ch.transport().baud_changes().len(), 2 * (BaudRate::ALL.len() + 1));
    }

    #[test]
    fn test_probe_finds_lowest_answering_rate() {
        let mut ch = channel_for(BaudRate::B2400, BaudRate::B19200);
        let mut negotiator = BaudNegotiator::new(BaudRate::B19200, 1);
        assert_eq!(negotiator.probe(&mut ch).unwrap(), Some(BaudRate::B2400));
        assert_eq!(
            negotiator.state(),
            NegotiationState::Confirmed(BaudRate::B2400)
        );
        // probing is silent
        assert!(ch.diagnostics().is_empty());
    }
}
