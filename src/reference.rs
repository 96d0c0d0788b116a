//! The four-stage workflow reference shown beside the chat.

/// One stage of the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowStage {
    pub title: &'static str,
    pub description: &'static str,
    pub items: &'static [&'static str],
}

pub const WORKFLOW_STAGES: [WorkflowStage; 4] = [
    WorkflowStage {
        title: "Project Conception and Definition",
        description: "Think of it as our opening act!",
        items: &[
            "Vision Document: Start with a clear and compelling vision. What problem are we solving? Who is our audience?",
            "Requirements Gathering: User stories are our friends here! We'll need detailed requirements – think functionality, performance, and user experience.",
            "Scope Definition: Scope creep is a terrible monster! Carefully define what's in and what's decidedly out of scope.",
        ],
    },
    WorkflowStage {
        title: "Design and Planning",
        description: "The blueprints to our masterpiece!",
        items: &[
            "High-Level Design: Sketch out the overall architecture. Think elegant diagrams and well-defined modules.",
            "Detailed Design: Dive into the nitty-gritty! Class diagrams, database schemas, API specifications...",
            "Technology Selection: Choosing the right tools is paramount! Languages, frameworks, databases - let's ensure they are a perfect fit.",
            "Task Breakdown: Break down the project into manageable tasks, estimate their effort, and assign them.",
        ],
    },
    WorkflowStage {
        title: "Implementation and Testing",
        description: "Where the magic happens... with a dash of debugging!",
        items: &[
            "Version Control: GitHub, GitLab, Bitbucket – pick your poison, but use it religiously!",
            "Coding Standards: Maintain consistency! A style guide is a must. Clean code is happy code!",
            "Unit Testing: Test, test, test! Early and often. Each component should be thoroughly tested in isolation.",
            "Integration Testing: Ensure all the pieces play nicely together.",
            "User Acceptance Testing (UAT): Get some feedback from real users! Their opinions are invaluable.",
        ],
    },
    WorkflowStage {
        title: "Deployment and Maintenance",
        description: "The grand finale and beyond!",
        items: &[
            "Deployment Strategy: Automated deployments are oh-so-chic! Plan a smooth and reliable deployment process.",
            "Monitoring: Keep a watchful eye on our creation. Performance monitoring and error logging are essential.",
            "Maintenance and Updates: Software is a living thing! Regular maintenance and updates are crucial.",
        ],
    },
];

/// Expand/collapse state for the reference pane.
///
/// Every stage toggles on its own; opening one never closes another.
#[derive(Debug, Clone)]
pub struct ReferencePanel {
    expanded: [bool; WORKFLOW_STAGES.len()],
    selected: usize,
    pub scroll: u16,
    follow_selection: bool,
}

impl Default for ReferencePanel {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferencePanel {
    /// Only the first stage starts expanded
    pub fn new() -> Self {
        let mut expanded = [false; WORKFLOW_STAGES.len()];
        expanded[0] = true;
        Self {
            expanded,
            selected: 0,
            scroll: 0,
            follow_selection: false,
        }
    }

    pub fn stages(&self) -> &'static [WorkflowStage] {
        &WORKFLOW_STAGES
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.expanded.get(index).copied().unwrap_or(false)
    }

    pub fn toggle(&mut self, index: usize) {
        if let Some(open) = self.expanded.get_mut(index) {
            *open = !*open;
        }
    }

    pub fn toggle_selected(&mut self) {
        self.toggle(self.selected);
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1).min(WORKFLOW_STAGES.len() - 1);
        self.follow_selection = true;
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.follow_selection = true;
    }

    /// True once after the selection moved; the view then scrolls it into sight
    pub fn take_follow_selection(&mut self) -> bool {
        std::mem::take(&mut self.follow_selection)
    }
}
