//! End-to-end engine tests: full invocations through `App::run_from` with
//! process exit disabled.

use std::sync::{Arc, Mutex, Once};

use futures::future::BoxFuture;
use rudder::{App, AppEvent, Command, Error, Failure, Kernel, Plugin, SharedContext, Value};

static TRACING: Once = Once::new();

/// Route engine debug logs through the test harness when RUST_LOG is set.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn argv(items: &[&str]) -> Vec<String> {
    init_tracing();
    items.iter().map(|s| s.to_string()).collect()
}

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn push(log: &Log, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

// ============================================
// Routing and parsing
// ============================================

mod routing {
    use super::*;

    #[tokio::test]
    async fn resolves_subcommand_with_interleaved_options() {
        let seen = log();
        let seen_in_action = seen.clone();
        // Remaining tokens are parsed against the resolved command's own
        // definitions, so build declares both flags.
        let mut app = App::new("app", "1.0.0").no_exit().command(
            Command::new("build")
                .option("-v, --verbose", "Verbose output")
                .option("-w, --watch", "Rebuild on change")
                .action(move |ctx| {
                    let seen = seen_in_action.clone();
                    async move {
                        push(&seen, format!("verbose={}", ctx.flag("verbose")));
                        push(&seen, format!("watch={}", ctx.flag("watch")));
                        push(&seen, format!("path={}", ctx.command.full_path()));
                        Ok(())
                    }
                }),
        );

        app.run_from(argv(&["--verbose", "build", "--watch"]))
            .await
            .unwrap();
        assert_eq!(
            entries(&seen),
            vec!["verbose=true", "watch=true", "path=app build"]
        );
    }

    #[tokio::test]
    async fn variadic_arguments_collect_the_tail() {
        let seen = log();
        let seen_in_action = seen.clone();
        let mut app = App::new("app", "1.0.0")
            .no_exit()
            .command(
                Command::new("copy")
                    .argument("<input>", "First file")
                    .argument("<files...>", "The rest")
                    .action(move |ctx| {
                        let seen = seen_in_action.clone();
                        async move {
                            push(&seen, format!("input={}", ctx.arg("input").unwrap()));
                            let files = ctx.arg("files").unwrap().as_array().unwrap();
                            push(&seen, format!("files={}", files.len()));
                            Ok(())
                        }
                    }),
            );

        app.run_from(argv(&["copy", "a.txt", "b.txt", "c.txt"]))
            .await
            .unwrap();
        assert_eq!(entries(&seen), vec!["input=a.txt", "files=2"]);
    }

    #[tokio::test]
    async fn negative_numbers_are_positionals_not_flags() {
        let seen = log();
        let seen_in_action = seen.clone();
        let mut app = App::new("app", "1.0.0").no_exit().command(
            Command::new("nice")
                .argument_def(
                    rudder::ArgumentDef::new("level")
                        .typed(rudder::ArgType::Number)
                        .required(),
                )
                .action(move |ctx| {
                    let seen = seen_in_action.clone();
                    async move {
                        push(&seen, format!("level={}", ctx.arg("level").unwrap()));
                        Ok(())
                    }
                }),
        );

        app.run_from(argv(&["nice", "-5"])).await.unwrap();
        assert_eq!(entries(&seen), vec!["level=-5"]);
    }

    #[tokio::test]
    async fn separator_passes_flag_like_literals_through() {
        let seen = log();
        let seen_in_action = seen.clone();
        let mut app = App::new("app", "1.0.0").no_exit().command(
            Command::new("exec")
                .argument("<cmd...>", "Command to run")
                .action(move |ctx| {
                    let seen = seen_in_action.clone();
                    async move {
                        push(&seen, ctx.arg("cmd").unwrap().to_string());
                        Ok(())
                    }
                }),
        );

        app.run_from(argv(&["exec", "--", "ls", "-la"])).await.unwrap();
        assert_eq!(entries(&seen), vec!["ls,-la"]);
    }

    #[tokio::test]
    async fn unknown_command_error_names_the_input() {
        let mut app = App::new("pkg", "1.0.0")
            .no_exit()
            .command(Command::new("install").action(|_| async { Ok(()) }));

        let err = app.run_from(argv(&["instal"])).await.unwrap_err();
        let shown = err.to_string();
        assert!(shown.contains("instal"));
        assert!(shown.contains("install"));
        assert_eq!(err.exit_code(), 1);
    }
}

// ============================================
// Validation failures
// ============================================

mod validation {
    use super::*;

    #[tokio::test]
    async fn strict_unknown_option_aborts_before_action() {
        let seen = log();
        let seen_in_action = seen.clone();
        let mut app = App::new("app", "1.0.0")
            .no_exit()
            .action(move |_| {
                let seen = seen_in_action.clone();
                async move {
                    push(&seen, "action");
                    Ok(())
                }
            });

        let err = app.run_from(argv(&["--foo"])).await.unwrap_err();
        match &err {
            Error::Validation { issues } => {
                assert_eq!(issues.len(), 1);
                assert!(issues[0].contains("--foo"));
            }
            other => panic!("Expected Validation, got {:?}", other),
        }
        assert_eq!(err.exit_code(), 1);
        assert!(entries(&seen).is_empty());
    }

    #[tokio::test]
    async fn missing_required_argument_is_aggregated() {
        let mut app = App::new("app", "1.0.0").no_exit().command(
            Command::new("build")
                .argument("<input>", "Entry point")
                .option("-p, --port <number>", "Port")
                .action(|_| async { Ok(()) }),
        );

        let err = app
            .run_from(argv(&["build", "--port", "abc"]))
            .await
            .unwrap_err();
        match err {
            Error::Validation { issues } => {
                // Both the coercion failure and the missing argument are
                // reported in one failure.
                assert_eq!(issues.len(), 2);
                assert!(issues.iter().any(|i| i.contains("--port")));
                assert!(issues.iter().any(|i| i.contains("<input>")));
            }
            other => panic!("Expected Validation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_strict_command_collects_unknowns() {
        let seen = log();
        let seen_in_action = seen.clone();
        let mut app = App::new("app", "1.0.0")
            .no_exit()
            .allow_unknown_options()
            .action(move |ctx| {
                let seen = seen_in_action.clone();
                async move {
                    push(&seen, ctx.options.unknown.join(","));
                    Ok(())
                }
            });

        app.run_from(argv(&["--foo", "--bar=1"])).await.unwrap();
        assert_eq!(entries(&seen), vec!["foo,bar"]);
    }
}

// ============================================
// Events
// ============================================

mod events {
    use super::*;

    fn recording_app(seen: &Log) -> App {
        let mut app = App::new("app", "1.2.3").no_exit();
        for event in ["command:before", "command:after", "help", "version", "error"] {
            let seen = seen.clone();
            app = app.on(event, move |ev: AppEvent| {
                let seen = seen.clone();
                async move {
                    push(&seen, ev.name().to_string());
                    Ok(())
                }
            });
        }
        app
    }

    #[tokio::test]
    async fn empty_argv_emits_help_and_completes() {
        let seen = log();
        let mut app = recording_app(&seen).action(|_| async { Ok(()) });
        app.run_from(Vec::new()).await.unwrap();
        assert_eq!(entries(&seen), vec!["help"]);
    }

    #[tokio::test]
    async fn version_flag_emits_version() {
        let seen = log();
        let mut app = recording_app(&seen).action(|_| async { Ok(()) });
        app.run_from(argv(&["--version"])).await.unwrap();
        assert_eq!(entries(&seen), vec!["version"]);
    }

    #[tokio::test]
    async fn unknown_command_emits_error_event() {
        let seen = log();
        // Action-less root with one subcommand: a stray positional is an
        // unknown command and must fire the error event.
        let mut app =
            recording_app(&seen).command(Command::new("build").action(|_| async { Ok(()) }));

        app.run_from(argv(&["run-it"])).await.unwrap_err();
        assert_eq!(entries(&seen), vec!["error"]);

        seen.lock().unwrap().clear();
        app.run_from(Vec::new()).await.unwrap();
        assert_eq!(entries(&seen), vec!["help"]);
    }

    #[tokio::test]
    async fn before_after_order_around_action() {
        let seen = log();
        let seen_in_action = seen.clone();
        let mut app = recording_app(&seen).argument("[what]", "").action(move |_| {
            let seen = seen_in_action.clone();
            async move {
                push(&seen, "action");
                Ok(())
            }
        });

        app.run_from(argv(&["deploy"])).await.unwrap();
        assert_eq!(
            entries(&seen),
            vec!["command:before", "action", "command:after"]
        );
    }

    #[tokio::test]
    async fn failing_before_handler_aborts_the_action() {
        let seen = log();
        let seen_in_action = seen.clone();
        let mut app = App::new("app", "1.0.0")
            .no_exit()
            .on("command:before", |_| async {
                anyhow::bail!("precondition failed")
            })
            .action(move |_| {
                let seen = seen_in_action.clone();
                async move {
                    push(&seen, "action");
                    Ok(())
                }
            });

        let err = app.run_from(argv(&[])).await;
        // Empty argv goes to help; use a positional-free invocation that
        // reaches the action instead.
        assert!(err.is_ok());

        let err = app.run_from(argv(&["--", "x"])).await.unwrap_err();
        assert!(err.to_string().contains("precondition failed"));
        assert!(entries(&seen).is_empty());
    }

    #[tokio::test]
    async fn action_error_emits_error_event_with_code() {
        let seen = log();
        let seen_in_handler = seen.clone();
        let mut app = App::new("app", "1.0.0")
            .no_exit()
            .on("error", move |ev: AppEvent| {
                let seen = seen_in_handler.clone();
                async move {
                    if let AppEvent::Error { code, message } = ev {
                        push(&seen, format!("{}:{}", code, message));
                    }
                    Ok(())
                }
            })
            .argument("[what]", "")
            .action(|_| async { Err(Failure::new(3, "deploy rejected").into()) });

        let err = app.run_from(argv(&["deploy"])).await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(entries(&seen), vec!["3:deploy rejected"]);
    }
}

// ============================================
// Middleware chain
// ============================================

mod middleware {
    use super::*;

    #[tokio::test]
    async fn chain_runs_in_order_before_action() {
        let seen = log();
        let first = seen.clone();
        let second = seen.clone();
        let in_action = seen.clone();
        let mut app = App::new("app", "1.0.0")
            .no_exit()
            .middleware(move |ctx, next| {
                let seen = first.clone();
                async move {
                    push(&seen, "auth");
                    next.run(ctx).await
                }
            })
            .middleware(move |ctx, next| {
                let seen = second.clone();
                async move {
                    push(&seen, "audit");
                    next.run(ctx).await
                }
            })
            .action(move |_| {
                let seen = in_action.clone();
                async move {
                    push(&seen, "action");
                    Ok(())
                }
            });

        app.run_from(argv(&["--", "go"])).await.unwrap();
        assert_eq!(entries(&seen), vec!["auth", "audit", "action"]);
    }

    #[tokio::test]
    async fn middleware_not_calling_next_skips_the_rest() {
        let seen = log();
        let gate = seen.clone();
        let in_action = seen.clone();
        let mut app = App::new("app", "1.0.0")
            .no_exit()
            .middleware(move |_ctx, _next| {
                let seen = gate.clone();
                async move {
                    push(&seen, "gate");
                    Ok(())
                }
            })
            .action(move |_| {
                let seen = in_action.clone();
                async move {
                    push(&seen, "action");
                    Ok(())
                }
            });

        app.run_from(argv(&["--", "go"])).await.unwrap();
        // The chain stopped silently; no error, no action.
        assert_eq!(entries(&seen), vec!["gate"]);
    }

    #[tokio::test]
    async fn middleware_error_fails_the_invocation() {
        let mut app = App::new("app", "1.0.0")
            .no_exit()
            .middleware(|_ctx, _next| async { anyhow::bail!("middleware exploded") })
            .action(|_| async { Ok(()) });

        let err = app.run_from(argv(&["--", "go"])).await.unwrap_err();
        assert!(err.to_string().contains("middleware exploded"));
        assert_eq!(err.exit_code(), 1);
    }
}

// ============================================
// Plugins
// ============================================

mod plugins {
    use super::*;

    /// Publishes a config value during init and counts its own inits.
    struct ConfigPlugin {
        inits: Log,
    }

    impl Plugin for ConfigPlugin {
        fn name(&self) -> &str {
            "config"
        }
        fn version(&self) -> &str {
            "1.0.0"
        }
        fn install(&self, _kernel: &mut Kernel) -> anyhow::Result<()> {
            Ok(())
        }
        fn on_init<'a>(
            &'a self,
            context: &'a mut SharedContext,
        ) -> BoxFuture<'a, anyhow::Result<()>> {
            Box::pin(async move {
                push(&self.inits, "config");
                context.set("config.loaded", serde_json::json!(true));
                Ok(())
            })
        }
    }

    /// Depends on config; observes its published value during init.
    struct ReporterPlugin {
        inits: Log,
    }

    impl Plugin for ReporterPlugin {
        fn name(&self) -> &str {
            "reporter"
        }
        fn version(&self) -> &str {
            "1.0.0"
        }
        fn dependencies(&self) -> Vec<String> {
            vec!["config".to_string()]
        }
        fn install(&self, _kernel: &mut Kernel) -> anyhow::Result<()> {
            Ok(())
        }
        fn on_init<'a>(
            &'a self,
            context: &'a mut SharedContext,
        ) -> BoxFuture<'a, anyhow::Result<()>> {
            Box::pin(async move {
                assert!(context.contains("config.loaded"));
                push(&self.inits, "reporter");
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn plugins_initialize_in_dependency_order_once() {
        let inits = log();
        // Registered dependent-first; init order must still be
        // dependency-first.
        let mut app = App::new("app", "1.0.0")
            .no_exit()
            .plugin(ReporterPlugin {
                inits: inits.clone(),
            })
            .unwrap()
            .plugin(ConfigPlugin {
                inits: inits.clone(),
            })
            .unwrap()
            .action(|_| async { Ok(()) });

        app.run_from(argv(&["--", "x"])).await.unwrap();
        // A second invocation must not re-run on_init.
        app.run_from(argv(&["--", "x"])).await.unwrap();
        assert_eq!(entries(&inits), vec!["config", "reporter"]);
    }

    #[tokio::test]
    async fn action_reads_plugin_published_context() {
        let inits = log();
        let seen = log();
        let seen_in_action = seen.clone();
        let mut app = App::new("app", "1.0.0")
            .no_exit()
            .plugin(ConfigPlugin { inits })
            .unwrap()
            .action(move |ctx| {
                let seen = seen_in_action.clone();
                async move {
                    push(
                        &seen,
                        format!("loaded={}", ctx.shared.get("config.loaded").unwrap()),
                    );
                    Ok(())
                }
            });

        app.run_from(argv(&["--", "x"])).await.unwrap();
        assert_eq!(entries(&seen), vec!["loaded=true"]);
    }

    #[tokio::test]
    async fn plugin_subscribes_during_install() {
        let seen = log();

        struct Tracer {
            seen: Log,
        }
        impl Plugin for Tracer {
            fn name(&self) -> &str {
                "tracer"
            }
            fn version(&self) -> &str {
                "0.1.0"
            }
            fn install(&self, kernel: &mut Kernel) -> anyhow::Result<()> {
                let seen = self.seen.clone();
                kernel.on("command:before", move |ev: AppEvent| {
                    let seen = seen.clone();
                    async move {
                        if let AppEvent::CommandBefore { command, .. } = ev {
                            push(&seen, format!("before:{}", command.full_path()));
                        }
                        Ok(())
                    }
                });
                Ok(())
            }
        }

        let mut app = App::new("app", "1.0.0")
            .no_exit()
            .plugin(Tracer { seen: seen.clone() })
            .unwrap()
            .command(Command::new("build").action(|_| async { Ok(()) }));

        app.run_from(argv(&["build"])).await.unwrap();
        assert_eq!(entries(&seen), vec!["before:app build"]);
    }

    #[tokio::test]
    async fn missing_dependency_fails_the_run() {
        let inits = log();
        let mut app = App::new("app", "1.0.0")
            .no_exit()
            .plugin(ReporterPlugin { inits })
            .unwrap()
            .action(|_| async { Ok(()) });

        let err = app.run_from(argv(&["--", "x"])).await.unwrap_err();
        let shown = err.to_string();
        assert!(shown.contains("reporter"));
        assert!(shown.contains("config"));
    }
}

// ============================================
// Typed options end to end
// ============================================

mod typed_options {
    use super::*;

    #[tokio::test]
    async fn coerced_values_reach_the_action() {
        let seen = log();
        let seen_in_action = seen.clone();
        let mut app = App::new("app", "1.0.0").no_exit().command(
            Command::new("serve")
                .option("-p, --port <number>", "Port")
                .option("--tags <array>", "Tags")
                .option("--env <object>", "Env pair")
                .action(move |ctx| {
                    let seen = seen_in_action.clone();
                    async move {
                        push(&seen, format!("port={}", ctx.opt("port").unwrap()));
                        push(&seen, format!("tags={}", ctx.opt("tags").unwrap()));
                        push(&seen, format!("env={}", ctx.opt("env").unwrap()));
                        Ok(())
                    }
                }),
        );

        app.run_from(argv(&[
            "serve",
            "-p3000",
            "--tags",
            "a, b , c",
            "--env=mode=dev",
        ]))
        .await
        .unwrap();
        assert_eq!(
            entries(&seen),
            vec!["port=3000", "tags=a,b,c", "env=mode=dev"]
        );
    }

    #[tokio::test]
    async fn negatable_option_defaults_and_negates() {
        let seen = log();
        let seen_in_action = seen.clone();
        let mut app = App::new("app", "1.0.0").no_exit().command(
            Command::new("render")
                .option_def(
                    rudder::OptionDef::new("color")
                        .negatable()
                        .default(Value::Bool(true)),
                )
                .action(move |ctx| {
                    let seen = seen_in_action.clone();
                    async move {
                        push(&seen, format!("color={}", ctx.flag("color")));
                        Ok(())
                    }
                }),
        );

        app.run_from(argv(&["render"])).await.unwrap();
        app.run_from(argv(&["render", "--no-color"])).await.unwrap();
        assert_eq!(entries(&seen), vec!["color=true", "color=false"]);
    }
}
