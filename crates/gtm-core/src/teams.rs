#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Team {
    Sales,
    ProductMarketing,
    Product,
}

/// A canned question offered on the welcome screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionCard {
    pub title: &'static str,
    pub description: &'static str,
    pub question: &'static str,
}

/// Quick one-click questions shown above the input.
pub const SUGGESTED_QUESTIONS: [&str; 5] = [
    "What objections did prospects raise?",
    "Summarize key insights from calls",
    "Which deals are most likely to close?",
    "What competitors were mentioned?",
    "What pricing concerns came up?",
];

const SALES_CARDS: [QuestionCard; 4] = [
    QuestionCard {
        title: "Pipeline Forecast",
        description: "Analyze opportunity pipeline and deal progression",
        question: "What is the current state of our opportunity pipeline? Which deals are most likely to close this quarter?",
    },
    QuestionCard {
        title: "AE Training Insights",
        description: "Identify coaching opportunities for new AEs",
        question: "What patterns do you see in calls from new AEs? Where do they need the most coaching and improvement?",
    },
    QuestionCard {
        title: "Call Feedback",
        description: "Get detailed feedback on specific rep calls",
        question: "Analyze the most recent sales calls and provide feedback on objection handling, discovery questions, and closing techniques.",
    },
    QuestionCard {
        title: "Win/Loss Analysis",
        description: "Understand why deals are won or lost",
        question: "What are the main reasons we are winning and losing deals? What patterns do you see in our wins vs losses?",
    },
];

const PMM_CARDS: [QuestionCard; 4] = [
    QuestionCard {
        title: "Objection Analysis",
        description: "Understand common prospect objections",
        question: "What objections are prospects raising most frequently? Categorize them and provide specific quotes from calls.",
    },
    QuestionCard {
        title: "Competitive Intelligence",
        description: "Track competitor mentions and positioning",
        question: "How do we compare to competitors mentioned in calls? What are prospects saying about alternatives they are considering?",
    },
    QuestionCard {
        title: "Messaging Effectiveness",
        description: "Analyze which messages resonate",
        question: "What messaging and value propositions are resonating with prospects? Analyze sentiment when different pitches are delivered.",
    },
    QuestionCard {
        title: "Positioning Gaps",
        description: "Identify opportunities to improve positioning",
        question: "What positioning gaps exist based on lost deals and objections? Where should we strengthen our narrative?",
    },
];

const PRODUCT_CARDS: [QuestionCard; 4] = [
    QuestionCard {
        title: "Onboarding Friction",
        description: "Identify pain points in onboarding",
        question: "Where is onboarding friction occurring? What pain points do customers mention during implementation and setup calls?",
    },
    QuestionCard {
        title: "Feature Requests",
        description: "Aggregate customer feature asks",
        question: "What features are customers asking for most frequently? Categorize and prioritize based on mention frequency and deal impact.",
    },
    QuestionCard {
        title: "Churn Analysis",
        description: "Understand why users churn",
        question: "Why are users churning? Analyze cancellation and support calls for common themes and preventable issues.",
    },
    QuestionCard {
        title: "Customer Love",
        description: "Extract positive sentiment patterns",
        question: "What do users love about our product? Extract positive sentiment patterns and specific features that delight customers.",
    },
];

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Sales => "sales",
            Team::ProductMarketing => "pmm",
            Team::Product => "product",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sales" | "gtm" => Some(Team::Sales),
            "pmm" | "marketing" => Some(Team::ProductMarketing),
            "product" => Some(Team::Product),
            _ => None,
        }
    }

    pub fn all() -> Vec<Team> {
        vec![Team::Sales, Team::ProductMarketing, Team::Product]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Team::Sales => "Sales / GTM",
            Team::ProductMarketing => "Product Marketing",
            Team::Product => "Product",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Team::Sales => "Pipeline, training, and call feedback",
            Team::ProductMarketing => "Objections, competitors, and messaging",
            Team::Product => "Friction points, features, and sentiment",
        }
    }

    pub fn questions(&self) -> &'static [QuestionCard] {
        match self {
            Team::Sales => &SALES_CARDS,
            Team::ProductMarketing => &PMM_CARDS,
            Team::Product => &PRODUCT_CARDS,
        }
    }

    /// The team after this one, wrapping around.
    pub fn next(&self) -> Team {
        match self {
            Team::Sales => Team::ProductMarketing,
            Team::ProductMarketing => Team::Product,
            Team::Product => Team::Sales,
        }
    }

    pub fn prev(&self) -> Team {
        match self {
            Team::Sales => Team::Product,
            Team::ProductMarketing => Team::Sales,
            Team::Product => Team::ProductMarketing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_str() {
        for team in Team::all() {
            assert_eq!(Team::from_str(team.as_str()), Some(team));
        }
        assert_eq!(Team::from_str("PMM"), Some(Team::ProductMarketing));
        assert_eq!(Team::from_str("finance"), None);
    }

    #[test]
    fn test_every_team_has_four_cards() {
        for team in Team::all() {
            assert_eq!(team.questions().len(), 4);
        }
        assert_eq!(Team::Product.questions()[2].title, "Churn Analysis");
    }

    #[test]
    fn test_cycling() {
        let mut team = Team::Sales;
        for _ in 0..3 {
            team = team.next();
        }
        assert_eq!(team, Team::Sales);
        assert_eq!(Team::Sales.prev(), Team::Product);
    }
}
