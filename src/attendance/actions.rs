use chrono::{NaiveDate, NaiveDateTime};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display as StrumDisplay};
use utoipa::ToSchema;

use crate::model::attendance::AttendanceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Action {
    CheckIn,
    StartBreak,
    EndBreak,
    CheckOut,
}

impl Action {
    pub fn success_message(self) -> &'static str {
        match self {
            Action::CheckIn => "Checked in successfully",
            Action::StartBreak => "Break started",
            Action::EndBreak => "Break ended",
            Action::CheckOut => "Checked out successfully",
        }
    }
}

/// Why an action was refused. These are normal outcomes, not faults.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Rejection {
    #[display(fmt = "Already checked in today")]
    AlreadyCheckedIn,
    #[display(fmt = "You have not checked in today")]
    NotCheckedIn,
    #[display(fmt = "Already checked out today")]
    AlreadyCheckedOut,
    #[display(fmt = "A break is already in progress")]
    BreakInProgress,
    #[display(fmt = "No break in progress")]
    NoBreakInProgress,
    #[display(fmt = "End your break before checking out")]
    CheckOutDuringBreak,
}

impl Rejection {
    /// The rejection for an action whose conditional write found the record
    /// already changed by a concurrent request.
    pub fn for_lost(action: Action) -> Self {
        match action {
            Action::CheckIn => Rejection::AlreadyCheckedIn,
            Action::StartBreak => Rejection::BreakInProgress,
            Action::EndBreak => Rejection::NoBreakInProgress,
            Action::CheckOut => Rejection::AlreadyCheckedOut,
        }
    }
}

/// The single write an accepted action performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Open { date: NaiveDate, at: NaiveDateTime },
    OpenBreak { attendance_id: u64, at: NaiveDateTime },
    CloseBreak { attendance_id: u64, break_id: u64, at: NaiveDateTime },
    Close { attendance_id: u64, at: NaiveDateTime },
}

/// Decides what `action` does given the user's record for today, if any.
pub fn plan(
    action: Action,
    today: Option<&AttendanceRecord>,
    now: NaiveDateTime,
) -> Result<Transition, Rejection> {
    match action {
        Action::CheckIn => match today {
            Some(_) => Err(Rejection::AlreadyCheckedIn),
            None => Ok(Transition::Open {
                date: now.date(),
                at: now,
            }),
        },
        Action::StartBreak => {
            let record = open_record(today)?;
            if record.ongoing_break().is_some() {
                return Err(Rejection::BreakInProgress);
            }
            Ok(Transition::OpenBreak {
                attendance_id: record.id,
                at: now,
            })
        }
        Action::EndBreak => {
            let record = open_record(today)?;
            let ongoing = record
                .ongoing_break()
                .ok_or(Rejection::NoBreakInProgress)?;
            Ok(Transition::CloseBreak {
                attendance_id: record.id,
                break_id: ongoing.id,
                at: now.max(ongoing.break_start),
            })
        }
        Action::CheckOut => {
            let record = open_record(today)?;
            if record.ongoing_break().is_some() {
                return Err(Rejection::CheckOutDuringBreak);
            }
            Ok(Transition::Close {
                attendance_id: record.id,
                at: now.max(record.check_in_time),
            })
        }
    }
}

fn open_record(today: Option<&AttendanceRecord>) -> Result<&AttendanceRecord, Rejection> {
    let record = today.ok_or(Rejection::NotCheckedIn)?;
    if record.is_checked_out() {
        return Err(Rejection::AlreadyCheckedOut);
    }
    Ok(record)
}

/// What an action endpoint sends back. A `null` attendance means the action was refused.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActionReply {
    pub attendance: Option<AttendanceRecord>,
    #[schema(example = "Checked in successfully")]
    pub message: String,
}

/// Result of one attendance action, as seen from either side of the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Succeeded {
        attendance: AttendanceRecord,
        message: String,
    },
    Rejected {
        reason: String,
    },
    Failed {
        error: String,
    },
}

impl ActionOutcome {
    pub fn rejected(reason: Rejection) -> Self {
        ActionOutcome::Rejected {
            reason: reason.to_string(),
        }
    }

    /// Classifies a reply that arrived successfully.
    pub fn from_reply(reply: ActionReply) -> Self {
        match reply.attendance {
            Some(attendance) => ActionOutcome::Succeeded {
                attendance,
                message: reply.message,
            },
            None => ActionOutcome::Rejected {
                reason: reply.message,
            },
        }
    }

    /// Wire form of a non-failed outcome.
    pub fn into_reply(self) -> Result<ActionReply, String> {
        match self {
            ActionOutcome::Succeeded {
                attendance,
                message,
            } => Ok(ActionReply {
                attendance: Some(attendance),
                message,
            }),
            ActionOutcome::Rejected { reason } => Ok(ActionReply {
                attendance: None,
                message: reason,
            }),
            ActionOutcome::Failed { error } => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::BreakInterval;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn checked_in() -> AttendanceRecord {
        AttendanceRecord {
            id: 5,
            user_id: 1,
            user_name: Some("Ann".into()),
            date: at(0, 0).date(),
            check_in_time: at(9, 0),
            check_out_time: None,
            breaks: vec![],
        }
    }

    fn on_break() -> AttendanceRecord {
        let mut r = checked_in();
        r.breaks.push(BreakInterval {
            id: 9,
            break_start: at(12, 0),
            break_end: None,
        });
        r
    }

    #[test]
    fn check_in_opens_today() {
        assert_eq!(
            plan(Action::CheckIn, None, at(9, 0)),
            Ok(Transition::Open {
                date: at(9, 0).date(),
                at: at(9, 0)
            })
        );
    }

    #[test]
    fn double_check_in_is_rejected() {
        assert_eq!(
            plan(Action::CheckIn, Some(&checked_in()), at(10, 0)),
            Err(Rejection::AlreadyCheckedIn)
        );
    }

    #[test]
    fn actions_before_check_in_are_rejected() {
        for action in [Action::StartBreak, Action::EndBreak, Action::CheckOut] {
            assert_eq!(plan(action, None, at(10, 0)), Err(Rejection::NotCheckedIn));
        }
    }

    #[test]
    fn actions_after_check_out_are_rejected() {
        let mut done = checked_in();
        done.check_out_time = Some(at(17, 0));
        for action in [Action::StartBreak, Action::EndBreak, Action::CheckOut] {
            assert_eq!(
                plan(action, Some(&done), at(18, 0)),
                Err(Rejection::AlreadyCheckedOut)
            );
        }
    }

    #[test]
    fn break_lifecycle() {
        assert_eq!(
            plan(Action::StartBreak, Some(&checked_in()), at(12, 0)),
            Ok(Transition::OpenBreak {
                attendance_id: 5,
                at: at(12, 0)
            })
        );
        assert_eq!(
            plan(Action::StartBreak, Some(&on_break()), at(12, 5)),
            Err(Rejection::BreakInProgress)
        );
        assert_eq!(
            plan(Action::EndBreak, Some(&on_break()), at(12, 30)),
            Ok(Transition::CloseBreak {
                attendance_id: 5,
                break_id: 9,
                at: at(12, 30)
            })
        );
        assert_eq!(
            plan(Action::EndBreak, Some(&checked_in()), at(12, 30)),
            Err(Rejection::NoBreakInProgress)
        );
    }

    #[test]
    fn check_out_during_break_is_rejected() {
        assert_eq!(
            plan(Action::CheckOut, Some(&on_break()), at(17, 0)),
            Err(Rejection::CheckOutDuringBreak)
        );
        assert_eq!(
            plan(Action::CheckOut, Some(&checked_in()), at(17, 0)),
            Ok(Transition::Close {
                attendance_id: 5,
                at: at(17, 0)
            })
        );
    }

    #[test]
    fn close_never_precedes_open() {
        assert_eq!(
            plan(Action::CheckOut, Some(&checked_in()), at(8, 0)),
            Ok(Transition::Close {
                attendance_id: 5,
                at: at(9, 0)
            })
        );
    }

    #[test]
    fn lost_races_map_to_the_state_that_won() {
        assert_eq!(Rejection::for_lost(Action::CheckIn), Rejection::AlreadyCheckedIn);
        assert_eq!(Rejection::for_lost(Action::StartBreak), Rejection::BreakInProgress);
        assert_eq!(Rejection::for_lost(Action::EndBreak), Rejection::NoBreakInProgress);
        assert_eq!(Rejection::for_lost(Action::CheckOut), Rejection::AlreadyCheckedOut);
    }

    #[test]
    fn null_attendance_is_a_rejection() {
        let reply = ActionReply {
            attendance: None,
            message: "Already checked in today".into(),
        };
        assert_eq!(
            ActionOutcome::from_reply(reply),
            ActionOutcome::Rejected {
                reason: "Already checked in today".into()
            }
        );
    }

    #[test]
    fn attendance_in_reply_is_a_success() {
        let reply = ActionReply {
            attendance: Some(checked_in()),
            message: "Checked in successfully".into(),
        };
        assert!(matches!(
            ActionOutcome::from_reply(reply),
            ActionOutcome::Succeeded { .. }
        ));
    }

    #[test]
    fn failures_have_no_reply() {
        let failed = ActionOutcome::Failed {
            error: "pool timed out".into(),
        };
        assert_eq!(failed.into_reply().unwrap_err(), "pool timed out");

        let rejected = ActionOutcome::rejected(Rejection::NoBreakInProgress).into_reply().unwrap();
        assert!(rejected.attendance.is_none());
        assert_eq!(rejected.message, "No break in progress");
    }
}
