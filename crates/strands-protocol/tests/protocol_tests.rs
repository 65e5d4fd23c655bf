//! Protocol layer tests - tokenizing, command parsing, reply rendering, error mapping.

#[cfg(test)]
mod tests {
    use strands_protocol::command::tokenize;
    use strands_protocol::*;

    fn creds(id: &str, secret: &str) -> Credentials {
        Credentials::new(id, secret)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tokenizer
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn tokenize_caps_at_four_fields() {
        let fields = tokenize("FORWARD a b c TWORD ocean\n");
        assert_eq!(fields, vec!["FORWARD", "a", "b", "c TWORD ocean"]);
    }

    #[test]
    fn tokenize_strips_one_terminator_from_last_field_only() {
        assert_eq!(tokenize("ROOMS\n"), vec!["ROOMS"]);
        assert_eq!(tokenize("LEAVE id key\r\n"), vec!["LEAVE", "id", "key"]);
        assert_eq!(tokenize("FORWARD a b c x\n\n"), vec!["FORWARD", "a", "b", "c x\n"]);
    }

    #[test]
    fn tokenize_without_terminator() {
        assert_eq!(tokenize("BOARD id key"), vec!["BOARD", "id", "key"]);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Command parsing
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn hello_without_credentials_issues_new_identity() {
        assert_eq!(Command::parse("HELLO\n").unwrap(), Command::Hello(None));
        assert_eq!(Command::parse("HELLO").unwrap(), Command::Hello(None));
    }

    #[test]
    fn hello_with_credentials_resumes() {
        assert_eq!(
            Command::parse("HELLO abc s3cret\n").unwrap(),
            Command::Hello(Some(creds("abc", "s3cret"))),
        );
    }

    #[test]
    fn hello_with_only_an_id_is_malformed() {
        let err = Command::parse("HELLO abc\n").unwrap_err();
        assert!(matches!(err, RelayError::MalformedCommand { verb: "HELLO", .. }));
        assert_eq!(err.reply(), Reply::Invalid);
    }

    #[test]
    fn join_carries_room_id() {
        assert_eq!(
            Command::parse("JOIN u k room-1\n").unwrap(),
            Command::Join { credentials: creds("u", "k"), room: "room-1".into(), password: None },
        );
    }

    #[test]
    fn join_splits_optional_password() {
        assert_eq!(
            Command::parse("JOIN u k room-1 cGFzcw==\n").unwrap(),
            Command::Join {
                credentials: creds("u", "k"),
                room: "room-1".into(),
                password: Some("cGFzcw==".into()),
            },
        );
        // An empty password field is no password at all.
        let Command::Join { password, .. } = Command::parse("JOIN u k room-1 \n").unwrap() else {
            panic!("expected join");
        };
        assert_eq!(password, None);
    }

    #[test]
    fn new_room_name_and_password_are_optional() {
        assert_eq!(
            Command::parse("NEWROOM u k\n").unwrap(),
            Command::NewRoom { credentials: creds("u", "k"), name: None, password: None },
        );
        // Clients always send the name field, even when it is empty.
        assert_eq!(
            Command::parse("NEWROOM u k \n").unwrap(),
            Command::NewRoom { credentials: creds("u", "k"), name: None, password: None },
        );
        assert_eq!(
            Command::parse("NEWROOM u k bmljaw==\n").unwrap(),
            Command::NewRoom {
                credentials: creds("u", "k"),
                name: Some("bmljaw==".into()),
                password: None,
            },
        );
        assert_eq!(
            Command::parse("NEWROOM u k bmljaw== cGFzcw==\n").unwrap(),
            Command::NewRoom {
                credentials: creds("u", "k"),
                name: Some("bmljaw==".into()),
                password: Some("cGFzcw==".into()),
            },
        );
    }

    #[test]
    fn join_without_room_is_malformed() {
        assert!(Command::parse("JOIN u k\n").is_err());
        assert!(Command::parse("JOIN u k \n").is_err());
    }

    #[test]
    fn set_board_keeps_payload_verbatim() {
        let cmd = Command::parse("SETBOARD u k eyJhIjogMX0=\n").unwrap();
        assert_eq!(
            cmd,
            Command::SetBoard { credentials: creds("u", "k"), payload: "eyJhIjogMX0=".into() },
        );
    }

    #[test]
    fn guess_splits_rest_into_coordinates() {
        assert_eq!(
            Command::parse("GUESS u k 3 5\n").unwrap(),
            Command::Guess { credentials: creds("u", "k"), x: 3, y: 5 },
        );
    }

    #[test]
    fn guess_with_bad_coordinates_is_malformed() {
        assert!(Command::parse("GUESS u k 3\n").is_err());
        assert!(Command::parse("GUESS u k x y\n").is_err());
        assert!(Command::parse("GUESS u k\n").is_err());
    }

    #[test]
    fn forward_splits_target_from_payload_once() {
        assert_eq!(
            Command::parse("FORWARD u k target SPANGRAM 1,2 3,4\n").unwrap(),
            Command::Forward {
                credentials: creds("u", "k"),
                target: "target".into(),
                payload: "SPANGRAM 1,2 3,4".into(),
            },
        );
    }

    #[test]
    fn forward_keeps_inner_terminator_of_payload() {
        let Command::Forward { payload, .. } = Command::parse("FORWARD u k t TWORD sea\n\n").unwrap() else {
            panic!("expected forward");
        };
        assert_eq!(payload, "TWORD sea\n");
    }

    #[test]
    fn forward_without_payload_is_malformed() {
        assert!(Command::parse("FORWARD u k target\n").is_err());
    }

    #[test]
    fn download_board_takes_date_from_last_field() {
        assert_eq!(
            Command::parse("DLBOARD 2024-05-01\n").unwrap(),
            Command::DownloadBoard { date: "2024-05-01".into() },
        );
        assert_eq!(
            Command::parse("DLBOARD someone 2024-05-01\n").unwrap(),
            Command::DownloadBoard { date: "2024-05-01".into() },
        );
        assert!(Command::parse("DLBOARD\n").is_err());
    }

    #[test]
    fn argumentless_commands() {
        assert_eq!(Command::parse("ROOMS\n").unwrap(), Command::Rooms);
        assert_eq!(Command::parse("BOARDSUMMARIES\n").unwrap(), Command::BoardSummaries);
        assert_eq!(Command::parse("PING\n").unwrap(), Command::Ping);
    }

    #[test]
    fn unknown_verb_is_rejected() {
        let err = Command::parse("DANCE u k\n").unwrap_err();
        assert_eq!(err, RelayError::UnknownCommand("DANCE".into()));
        assert_eq!(err.reply(), Reply::Invalid);

        let err = Command::parse("").unwrap_err();
        assert_eq!(err.reply(), Reply::Invalid);
    }

    #[test]
    fn verbs_are_case_sensitive() {
        assert!(Command::parse("hello\n").is_err());
    }

    #[test]
    fn parsed_command_reports_its_verb() {
        assert_eq!(Command::parse("HINT u k\n").unwrap().verb(), Verbs::HINT);
        assert_eq!(Command::parse("ENDGUESS u k\n").unwrap().verb(), Verbs::END_GUESS);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Replies
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn replies_render_as_terminated_lines() {
        assert_eq!(Reply::Hello { id: "a".into(), secret: "b".into() }.to_line(), "HELLO a b\n");
        assert_eq!(Reply::NewRoom("r".into()).to_line(), "NEWROOM r\n");
        assert_eq!(
            Reply::Room { id: "r".into(), members: 2, name: None, locked: false }.to_line(),
            "ROOM r 2 NONE\n"
        );
        assert_eq!(Reply::Guess { x: -1, y: 7 }.to_line(), "GUESS -1 7\n");
        assert_eq!(Reply::HostState("src".into()).to_line(), "HOSTSTATE src\n");
        assert_eq!(Reply::Cool.to_line(), "COOL\n");
        assert_eq!(Reply::End.to_line(), "END\n");
    }

    #[test]
    fn locked_room_is_marked_in_listing() {
        let room = Reply::Room { id: "r".into(), members: 1, name: Some("bmljaw==".into()), locked: true };
        assert_eq!(room.to_line(), "ROOM r 1 bmljaw== PASSWORD\n");
    }

    #[test]
    fn raw_reply_is_not_terminated() {
        assert_eq!(Reply::Raw("TWORD sea".into()).to_line(), "TWORD sea");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Error mapping
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn precondition_errors_keep_their_distinct_replies() {
        assert_eq!(RelayError::NotInRoom("u".into()).reply(), Reply::Invalid);
        assert_eq!(RelayError::AuthFailed("u".into()).reply(), Reply::Invalid);
        assert_eq!(RelayError::NoBoard("r".into()).reply(), Reply::No);
        assert_eq!(RelayError::RoomNotFound("r".into()).reply(), Reply::No);
        assert_eq!(RelayError::WrongPassword("r".into()).reply(), Reply::No);
        assert_eq!(RelayError::TargetUnavailable("t".into()).reply(), Reply::No);
        assert_eq!(RelayError::NoHost("r".into()).reply(), Reply::No);
        assert_eq!(RelayError::BoardUnavailable("d".into()).reply(), Reply::No);
    }
}
