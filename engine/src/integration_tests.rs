#[cfg(test)]
mod integration_tests {
    use crate::config::{Config, EngineConfig, EventConfig};
    use crate::engine::Engine;
    use bus::{BusError, EventBus};
    use event_core::context::Context;
    use event_core::event::{Event, EventKind, EventParams};
    use event_core::fixtures::FixtureBuilder;
    use event_core::model::{Chapter, Course, ModuleInstance};
    use legacy_log::{LegacyLogEntry, legacy_log_data};

    fn setup() -> (Course, ModuleInstance, Chapter) {
        let mut fixtures = FixtureBuilder::new();
        let course = fixtures.create_course();
        let module = fixtures.create_module(&course);
        let chapter = fixtures.create_chapter(&module);
        (course, module, chapter)
    }

    fn expected(
        course_id: i64,
        action: &str,
        url: String,
        object_id: String,
        cm_id: String,
    ) -> LegacyLogEntry {
        LegacyLogEntry {
            course_id,
            module: "giportfolio".to_string(),
            action: action.to_string(),
            url,
            object_id,
            cm_id,
        }
    }

    /// Triggers `event` inside a capture window and returns the single
    /// captured copy.
    fn trigger_and_capture(bus: &EventBus, mut event: Event) -> Event {
        let sink = bus.capture();
        bus.trigger(&mut event).expect("trigger should succeed");
        let mut events = sink.get_events();
        assert_eq!(events.len(), 1);
        events.remove(0)
    }

    #[test]
    fn test_chapter_created() {
        let (course, module, chapter) = setup();
        let bus = EventBus::new();
        let context = module.context();

        let event = Event::chapter_created(&module, &context, &chapter).unwrap();
        let event = trigger_and_capture(&bus, event);

        assert_eq!(event.kind(), EventKind::ChapterCreated);
        assert_eq!(*event.context(), Context::module(course.id, module.cmid));
        assert_eq!(event.object_id(), Some(chapter.id));
        assert_eq!(
            legacy_log_data(&event).unwrap(),
            expected(
                course.id,
                "add chapter",
                format!("view.php?id={}&chapterid={}", module.cmid, chapter.id),
                chapter.id.to_string(),
                module.cmid.to_string(),
            )
        );
    }

    #[test]
    fn test_chapter_updated() {
        let (course, module, chapter) = setup();
        let bus = EventBus::new();
        let context = module.context();

        let event = Event::chapter_updated(&module, &context, &chapter).unwrap();
        let event = trigger_and_capture(&bus, event);

        assert_eq!(event.kind(), EventKind::ChapterUpdated);
        assert_eq!(*event.context(), Context::module(course.id, module.cmid));
        assert_eq!(event.object_id(), Some(chapter.id));
        assert_eq!(
            legacy_log_data(&event).unwrap(),
            expected(
                course.id,
                "update chapter",
                format!("view.php?id={}&chapterid={}", module.cmid, chapter.id),
                chapter.id.to_string(),
                module.cmid.to_string(),
            )
        );
    }

    #[test]
    fn test_chapter_deleted() {
        let (course, module, chapter) = setup();
        let bus = EventBus::new();
        let context = module.context();

        let event = Event::chapter_deleted(&module, &context, &chapter).unwrap();
        let legacy = expected(
            course.id,
            "update",
            format!("view.php?id={}", module.cmid),
            module.id.to_string(),
            module.cmid.to_string(),
        );
        let event = trigger_and_capture(&bus, event);

        assert_eq!(event.kind(), EventKind::ChapterDeleted);
        assert_eq!(*event.context(), Context::module(course.id, module.cmid));
        assert_eq!(event.object_id(), Some(chapter.id));
        assert_eq!(legacy_log_data(&event).unwrap(), legacy);
    }

    #[test]
    fn test_course_module_instance_list_viewed() {
        let (course, _, _) = setup();
        let bus = EventBus::new();

        let event = Event::create(
            EventKind::CourseModuleInstanceListViewed,
            EventParams::new().with_context(course.context()),
        )
        .unwrap();
        let event = trigger_and_capture(&bus, event);

        assert_eq!(event.kind(), EventKind::CourseModuleInstanceListViewed);
        assert_eq!(*event.context(), Context::course(course.id));
        assert_eq!(event.object_id(), None);
        assert_eq!(
            legacy_log_data(&event).unwrap(),
            expected(
                course.id,
                "view all",
                format!("index.php?id={}", course.id),
                String::new(),
                String::new(),
            )
        );
    }

    #[test]
    fn test_course_module_viewed() {
        let (course, module, _) = setup();
        let bus = EventBus::new();

        let event = Event::create(
            EventKind::CourseModuleViewed,
            EventParams::new()
                .with_context(module.context())
                .with_object_id(module.id),
        )
        .unwrap();
        let event = trigger_and_capture(&bus, event);

        assert_eq!(event.kind(), EventKind::CourseModuleViewed);
        assert_eq!(*event.context(), Context::module(course.id, module.cmid));
        assert_eq!(event.object_id(), Some(module.id));
        assert_eq!(
            legacy_log_data(&event).unwrap(),
            expected(
                course.id,
                "view",
                format!("view.php?id={}", module.cmid),
                module.id.to_string(),
                module.cmid.to_string(),
            )
        );
    }

    #[test]
    fn test_chapter_viewed() {
        let (course, module, chapter) = setup();
        let bus = EventBus::new();
        let context = module.context();

        let event = Event::chapter_viewed(&module, &context, &chapter).unwrap();
        let event = trigger_and_capture(&bus, event);

        assert_eq!(event.kind(), EventKind::ChapterViewed);
        assert_eq!(*event.context(), Context::module(course.id, module.cmid));
        assert_eq!(event.object_id(), Some(chapter.id));
        assert_eq!(
            legacy_log_data(&event).unwrap(),
            expected(
                course.id,
                "view chapter",
                format!("view.php?id={}&amp;chapterid={}", module.cmid, chapter.id),
                chapter.id.to_string(),
                module.cmid.to_string(),
            )
        );
    }

    #[test]
    fn test_retrigger_keeps_capture_count() {
        let (_, module, chapter) = setup();
        let bus = EventBus::new();
        let sink = bus.capture();

        let mut event = Event::chapter_viewed(&module, &module.context(), &chapter).unwrap();
        bus.trigger(&mut event).unwrap();
        let err = bus.trigger(&mut event).unwrap_err();

        assert!(matches!(err, BusError::AlreadyTriggered { .. }));
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn test_engine_replays_every_kind() {
        let (course, module, chapter) = setup();
        let temp_dir = tempfile::TempDir::new().unwrap();
        let legacy_path = temp_dir.path().join("legacy.jsonl");

        let events = EventKind::ALL
            .iter()
            .map(|kind| {
                let module_scoped = *kind != EventKind::CourseModuleInstanceListViewed;
                EventConfig {
                    kind: *kind,
                    course_id: course.id,
                    cmid: module_scoped.then_some(module.cmid),
                    instance_id: module_scoped.then_some(module.id),
                    chapter_id: kind.is_chapter_event().then_some(chapter.id),
                    user_id: Some(2),
                }
            })
            .collect();
        let config = Config {
            engine: EngineConfig {
                legacy_log_path: Some(legacy_path.clone()),
                ..Default::default()
            },
            legacy: Vec::new(),
            events,
        };
        config.validate().expect("config should validate");

        let engine = Engine::new(config).unwrap();
        let observed = engine.bus().capture();
        let summary = engine.run();

        assert_eq!(summary.triggered, EventKind::ALL.len());
        assert_eq!(summary.failed, 0);
        assert_eq!(observed.count(), EventKind::ALL.len());

        let kinds: Vec<_> = observed.get_events().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, EventKind::ALL.to_vec());

        let entries = engine.legacy_entries();
        let actions: Vec<_> = entries.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(
            actions,
            vec!["add chapter", "update chapter", "update", "view chapter", "view", "view all"]
        );

        let contents = std::fs::read_to_string(&legacy_path).unwrap();
        assert_eq!(contents.lines().count(), EventKind::ALL.len());
    }
}
