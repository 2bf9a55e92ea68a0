use tracing::{debug, info, trace, warn};

use crate::{
    config::MatrixOptions,
    document::Surface,
    parser::parse,
    scheduler::{EventQueue, Job, TaskHandle},
    symbols::SymbolSource,
    types::{LayoutStrategy, Node, RenderSlot, Unit},
};

/// Builds the render nodes for `units`: one slot per character unit and,
/// under the structured strategy, one break per break unit.
pub fn build_nodes(units: &[Unit], strategy: LayoutStrategy, now: u64) -> Vec<Node> {
    units
        .iter()
        .filter_map(|unit| match (unit, unit.rest_glyph()) {
            (Unit::Break, _) => match strategy {
                LayoutStrategy::Structured => Some(Node::Break),
                LayoutStrategy::Flow => None,
            },
            (Unit::Character { is_space, .. }, Some(glyph)) => {
                Some(Node::Slot(RenderSlot::new(glyph, *is_space, now)))
            }
            (Unit::Character { .. }, None) => None,
        })
        .collect()
}

#[derive(Clone, Copy, Debug)]
struct Scramble {
    started_at: u64,
    frame: TaskHandle,
}

pub struct MatrixText {
    surface: Surface,
    options: MatrixOptions,
    alphabet: Vec<char>,
    units: Vec<Unit>,
    /// Slot index to unit index.
    slot_units: Vec<usize>,
    /// Slot index to node index.
    slot_nodes: Vec<usize>,
    scrambles: Vec<Option<Scramble>>,
    #[cfg(test)]
    dispatched_at: Vec<Option<u64>>,
    is_animating: bool,
    current_index: usize,
    sequencer: Option<TaskHandle>,
    queue: EventQueue,
    symbols: Box<dyn SymbolSource>,
}

impl MatrixText {
    pub fn new(
        surface: Surface,
        options: MatrixOptions,
        symbols: Box<dyn SymbolSource>,
        now: u64,
    ) -> Self {
        let options = options.resolved();
        let units = parse(surface.content(), options.format);

        let mut matrix = Self {
            surface,
            alphabet: options.alphabet(),
            options,
            units,
            slot_units: Vec::new(),
            slot_nodes: Vec::new(),
            scrambles: Vec::new(),
            #[cfg(test)]
            dispatched_at: Vec::new(),
            is_animating: false,
            current_index: 0,
            sequencer: None,
            queue: EventQueue::new(),
            symbols,
        };

        matrix.build_layout(now);
        matrix.sequencer = Some(
            matrix
                .queue
                .set_timeout(now, matrix.options.initial_delay, Job::Start),
        );

        debug!(
            surface = matrix.id(),
            units = matrix.units.len(),
            slots = matrix.slot_count(),
            layout = ?matrix.options.layout,
            period = matrix.options.period,
            duration = matrix.options.duration,
            "matrix text constructed"
        );

        matrix
    }

    /// Replaces the surface's children with freshly built slots.
    fn build_layout(&mut self, now: u64) {
        let nodes = build_nodes(&self.units, self.options.layout, now);

        self.slot_units = self
            .units
            .iter()
            .enumerate()
            .filter(|(_, unit)| !unit.is_break())
            .map(|(idx, _)| idx)
            .collect();
        self.slot_nodes = nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, Node::Slot(_)))
            .map(|(idx, _)| idx)
            .collect();
        self.scrambles = vec![None; self.slot_units.len()];
        #[cfg(test)]
        {
            self.dispatched_at = vec![None; self.slot_units.len()];
        }

        self.surface.replace_nodes(nodes);
    }

    pub fn id(&self) -> &str {
        self.surface.id()
    }

    pub fn nodes(&self) -> &[Node] {
        self.surface.nodes()
    }

    #[cfg(test)]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn slot_count(&self) -> usize {
        self.slot_units.len()
    }

    #[cfg(test)]
    pub fn slot(&self, slot: usize) -> Option<&RenderSlot> {
        match self.nodes().get(*self.slot_nodes.get(slot)?) {
            Some(Node::Slot(render)) => Some(render),
            _ => None,
        }
    }

    fn slot_mut(&mut self, slot: usize) -> Option<&mut RenderSlot> {
        let node = *self.slot_nodes.get(slot)?;
        match self.surface.node_mut(node) {
            Some(Node::Slot(render)) => Some(render),
            _ => None,
        }
    }

    fn unit_of(&self, slot: usize) -> Option<Unit> {
        self.slot_units.get(slot).map(|&idx| self.units[idx])
    }

    fn set_matrix(&mut self, slot: usize, on: bool) {
        if let Some(&idx) = self.slot_units.get(slot) {
            if let Unit::Character { is_matrix, .. } = &mut self.units[idx] {
                *is_matrix = on;
            }
        }
    }

    pub fn is_animating(&self) -> bool {
        self.is_animating
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[cfg(test)]
    pub fn is_scrambling(&self, slot: usize) -> bool {
        self.scrambles.get(slot).is_some_and(Option::is_some)
    }

    #[cfg(test)]
    /// When the slot last entered the scrambling state.
    pub fn dispatched_at(&self, slot: usize) -> Option<u64> {
        self.dispatched_at.get(slot).copied().flatten()
    }

    /// Starts a playback sequence. Does nothing while one is in flight.
    pub fn start(&mut self, now: u64) {
        if self.is_animating {
            warn!(surface = self.id(), "start ignored, already animating");
            return;
        }

        if let Some(pending) = self.sequencer.take() {
            self.queue.cancel(pending);
        }

        info!(surface = self.id(), slots = self.slot_count(), "animation started");

        self.is_animating = true;
        self.current_index = 0;
        self.next_letter(now);
    }

    fn next_letter(&mut self, now: u64) {
        if self.current_index >= self.slot_count() {
            self.sequencer = None;
            self.finish_if_settled();
            return;
        }

        self.animate_letter(self.current_index, now);
        self.current_index += 1;
        self.sequencer = Some(
            self.queue
                .set_timeout(now, self.options.letter_interval, Job::NextLetter),
        );
    }

    fn animate_letter(&mut self, slot: usize, now: u64) {
        let Some(unit) = self.unit_of(slot) else {
            return;
        };
        if matches!(unit, Unit::Character { is_space: true, .. }) {
            return;
        }

        if let Some(previous) = self.scrambles[slot].take() {
            self.queue.cancel(previous.frame);
        }

        debug!(surface = self.id(), slot, at = now, "letter dispatched");

        let frame = self.queue.request_frame(Job::Frame(slot));
        self.scrambles[slot] = Some(Scramble {
            started_at: now,
            frame,
        });
        #[cfg(test)]
        {
            self.dispatched_at[slot] = Some(now);
        }
        self.set_matrix(slot, true);
    }

    fn update_frame(&mut self, slot: usize, now: u64) {
        let Some(scramble) = self.scrambles.get(slot).copied().flatten() else {
            return;
        };

        let elapsed = now.saturating_sub(scramble.started_at);
        if elapsed < self.options.letter_animation_duration {
            let glyph = self.symbols.next_symbol(&self.alphabet);
            if let Some(render) = self.slot_mut(slot) {
                render.glyph = glyph;
                render.set_highlight(true, now);
            }

            let frame = self.queue.request_frame(Job::Frame(slot));
            self.scrambles[slot] = Some(Scramble { frame, ..scramble });
        } else {
            trace!(surface = self.id(), slot, elapsed, "letter settled");

            self.settle(slot, now);
            self.finish_if_settled();
        }
    }

    fn settle(&mut self, slot: usize, now: u64) {
        let original = self.unit_of(slot).and_then(|unit| unit.rest_glyph());
        if let Some(render) = self.slot_mut(slot) {
            if let Some(glyph) = original {
                render.glyph = glyph;
            }
            render.set_highlight(false, now);
        }

        self.scrambles[slot] = None;
        self.set_matrix(slot, false);
    }

    fn finish_if_settled(&mut self) {
        if self.is_animating
            && self.sequencer.is_none()
            && self.scrambles.iter().all(Option::is_none)
        {
            self.is_animating = false;
            info!(surface = self.id(), "animation finished");
        }
    }

    /// Fires every timer due by `now`, then runs one animation frame.
    pub fn tick(&mut self, now: u64) {
        while let Some((due, job)) = self.queue.pop_due(now) {
            self.run(job, due);
        }

        for job in self.queue.take_frames() {
            self.run(job, now);
        }
    }

    fn run(&mut self, job: Job, now: u64) {
        match job {
            Job::Start => {
                self.sequencer = None;
                self.start(now);
            }
            Job::NextLetter => self.next_letter(now),
            Job::Frame(slot) => self.update_frame(slot, now),
        }
    }

    /// Cancels everything pending and puts every slot back at rest.
    pub fn stop(&mut self, now: u64) {
        self.queue.clear();
        self.sequencer = None;

        for slot in 0..self.slot_count() {
            if self.scrambles[slot].is_some() {
                self.settle(slot, now);
            }
        }

        if self.is_animating {
            info!(surface = self.id(), at = self.current_index, "animation stopped");
        }
        self.is_animating = false;
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        !self.is_animating && self.queue.is_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        symbols::{RngSymbols, testing::CycleSymbols},
        types::NBSP,
    };
    use proptest::prelude::*;

    fn matrix(content: &str, options: MatrixOptions) -> MatrixText {
        MatrixText::new(
            Surface::new("title", content, &options),
            options,
            Box::new(CycleSymbols::default()),
            0,
        )
    }

    fn glyphs(matrix: &MatrixText) -> String {
        (0..matrix.slot_count())
            .map(|slot| matrix.slot(slot).map_or('?', |s| s.glyph))
            .collect()
    }

    fn run_to_end(matrix: &mut MatrixText, limit: u64) -> u64 {
        let mut now = 0;
        while now <= limit {
            matrix.tick(now);
            if now > 0 && matrix.is_idle() {
                break;
            }
            now += 1;
        }
        now
    }

    #[test]
    fn hi_timeline() {
        let mut hi = matrix("Hi", MatrixOptions::default());
        assert_eq!(hi.slot_count(), 2);

        for now in 0..=1000 {
            hi.tick(now);

            let expected = (200..800).contains(&now);
            assert_eq!(hi.is_animating(), expected, "is_animating at t={now}");

            if now == 699 {
                assert!(hi.slot(0).unwrap().highlighted);
                assert!(hi.is_scrambling(0));
            }
            if now == 700 {
                assert_eq!(hi.slot(0).unwrap().glyph, 'H');
                assert!(!hi.slot(0).unwrap().highlighted);
                assert!(hi.is_scrambling(1));
            }
        }

        assert_eq!(hi.dispatched_at(0), Some(200));
        assert_eq!(hi.dispatched_at(1), Some(300));
        assert_eq!(glyphs(&hi), "Hi");
    }

    #[test]
    fn scrambling_shows_alphabet_symbols_highlighted() {
        let options = MatrixOptions {
            chars: "xyz".to_string(),
            ..MatrixOptions::default()
        };
        let mut m = matrix("ab", options);

        m.tick(200);
        let slot = m.slot(0).unwrap();
        assert_eq!(slot.glyph, 'x');
        assert!(slot.highlighted);
        assert!(matches!(m.units()[0], Unit::Character { is_matrix: true, .. }));

        m.tick(216);
        assert_eq!(m.slot(0).unwrap().glyph, 'y');
        assert_eq!(m.slot(1).unwrap().glyph, 'b');
    }

    #[test]
    fn spaces_are_never_touched() {
        let mut m = matrix("a b", MatrixOptions::default());
        let before = *m.slot(1).unwrap();
        assert_eq!(before.glyph, NBSP);

        for now in 0..=1200 {
            m.tick(now);
            assert_eq!(*m.slot(1).unwrap(), before);
            assert!(!m.is_scrambling(1));
        }

        assert_eq!(m.dispatched_at(1), None);
        // The space still costs one interval.
        assert_eq!(m.dispatched_at(2), Some(400));
    }

    #[test]
    fn marcos_galdamez_structured() {
        let m = matrix("Marcos<br>Galdamez", MatrixOptions::default());

        assert_eq!(m.slot_count(), 14);
        let breaks: Vec<usize> = m
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, Node::Break))
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(breaks, vec![6]);
        assert_eq!(glyphs(&m), "MarcosGaldamez");
    }

    #[test]
    fn marcos_galdamez_flow() {
        let options = MatrixOptions {
            layout: LayoutStrategy::Flow,
            ..MatrixOptions::default()
        };
        let m = matrix("Marcos<br>Galdamez", options);

        assert_eq!(m.slot_count(), 14);
        assert_eq!(m.nodes().len(), 14);
    }

    #[test]
    fn empty_and_break_only_complete_immediately() {
        for content in ["", "<br><br>"] {
            let mut m = matrix(content, MatrixOptions::default());
            assert_eq!(m.slot_count(), 0);

            m.tick(200);
            assert!(!m.is_animating());
            assert!(m.is_idle());
        }

        let m = matrix("<br><br>", MatrixOptions::default());
        assert_eq!(m.nodes(), &[Node::Break, Node::Break]);
    }

    #[test]
    fn start_while_animating_is_a_noop() {
        let mut plain = matrix("Hello", MatrixOptions::default());
        let mut poked = matrix("Hello", MatrixOptions::default());

        for now in 0..=1500 {
            plain.tick(now);
            poked.tick(now);

            if poked.is_animating() {
                let index = poked.current_index();
                poked.start(now);
                assert_eq!(poked.current_index(), index);
            }

            assert_eq!(plain.is_animating(), poked.is_animating(), "t={now}");
        }

        for slot in 0..5 {
            assert_eq!(plain.dispatched_at(slot), poked.dispatched_at(slot));
        }
    }

    #[test]
    fn replay_after_finish() {
        let mut m = matrix("ok", MatrixOptions::default());
        let end = run_to_end(&mut m, 5000);
        assert!(!m.is_animating());

        m.start(end + 10);
        assert!(m.is_animating());
        assert_eq!(m.dispatched_at(0), Some(end + 10));

        m.tick(end + 10);
        assert!(m.slot(0).unwrap().highlighted);
    }

    #[test]
    fn stop_restores_everything() {
        let mut m = matrix("Matrix", MatrixOptions::default());
        for now in 0..=450 {
            m.tick(now);
        }
        assert!(m.is_scrambling(0));

        m.stop(450);
        assert!(!m.is_animating());
        assert!(m.is_idle());
        assert_eq!(glyphs(&m), "Matrix");

        for now in 451..=2000 {
            m.tick(now);
        }
        assert_eq!(glyphs(&m), "Matrix");
        assert!((0..6).all(|slot| !m.slot(slot).unwrap().highlighted));
        assert!(
            m.units()
                .iter()
                .all(|u| matches!(u, Unit::Character { is_matrix: false, .. }))
        );
    }

    #[test]
    fn stop_before_initial_delay_cancels_the_run() {
        let mut m = matrix("x", MatrixOptions::default());
        m.stop(50);

        for now in 50..=1000 {
            m.tick(now);
        }
        assert_eq!(m.dispatched_at(0), None);
    }

    #[test]
    fn coarse_frames_still_settle_after_duration() {
        let mut m = matrix("abc", MatrixOptions::default());

        let mut now = 0;
        while now <= 2000 {
            m.tick(now);
            for slot in 0..3 {
                if let Some(at) = m.dispatched_at(slot) {
                    if m.is_scrambling(slot) {
                        assert!(now < at + 500);
                    }
                }
            }
            now += 33;
        }

        assert_eq!(glyphs(&m), "abc");
        assert!(!m.is_animating());
    }

    fn fragment() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                "[a-zA-Z0-9 ]{0,6}",
                Just("<br>".to_string()),
            ],
            0..8,
        )
        .prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn one_slot_per_character_unit(content in fragment(), flow in any::<bool>()) {
            let options = MatrixOptions {
                layout: if flow { LayoutStrategy::Flow } else { LayoutStrategy::Structured },
                ..MatrixOptions::default()
            };
            let m = matrix(&content, options);

            let characters = m.units().iter().filter(|u| !u.is_break()).count();
            let slots = m.nodes().iter().filter(|n| matches!(n, Node::Slot(_))).count();
            prop_assert_eq!(slots, characters);
            prop_assert_eq!(m.slot_count(), characters);
        }

        #[test]
        fn dispatch_follows_input_order_and_settles(
            content in "[a-z ]{1,12}",
            interval in 1u64..150,
            duration in 1u64..600,
            seed in any::<u64>(),
        ) {
            let options = MatrixOptions {
                letter_interval: interval,
                letter_animation_duration: duration,
                ..MatrixOptions::default()
            };
            let mut m = MatrixText::new(
                Surface::new("t", &content, &options),
                options,
                Box::new(RngSymbols::seeded(seed)),
                0,
            );
            run_to_end(&mut m, 20_000);

            let stamps: Vec<u64> = (0..m.slot_count()).filter_map(|s| m.dispatched_at(s)).collect();
            prop_assert!(stamps.windows(2).all(|w| w[0] <= w[1]));

            let expected: String = content.chars().map(|c| if c == ' ' { NBSP } else { c }).collect();
            prop_assert_eq!(glyphs(&m), expected);
            prop_assert!((0..m.slot_count()).all(|s| !m.slot(s).unwrap().highlighted));
            prop_assert!(!m.is_animating());
        }
    }
}
