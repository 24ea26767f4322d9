/*!

This is the long-form manual for `survey_stats` and `survey_analysis`.

## Inputs

A season is described by a pipeline configuration file (JSON), a set of code
schemes, and two datasets in JSON Lines format: the messages and the
individuals.

### Pipeline configuration

```json
{
  "pipelineName": "COVID19-KE-Urban",
  "consentWithdrawnKey": "consent_withdrawn",
  "uidKey": "uid",
  "codeSchemes": {
    "s01e01": "code_schemes/s01e01.json",
    "gender": "code_schemes/gender.json"
  },
  "rqaCodingPlans": [
    {
      "datasetName": "s01e01",
      "rawField": "rqa_s01e01_raw",
      "codingConfigurations": [
        {
          "codedField": "rqa_s01e01_coded",
          "codeScheme": "s01e01",
          "codingMode": "multiple",
          "analysisFileKey": "rqa_s01e01_"
        }
      ]
    }
  ],
  "demogCodingPlans": [],
  "surveyCodingPlans": [],
  "genderAnalysisKey": "gender",
  "sampleSize": 100
}
```

Paths are relative to the configuration file. The `rqaCodingPlans` are the
episodes: every configuration must use the `multiple` coding mode. The
`demogCodingPlans` must use the `single` coding mode. A configuration without
an `analysisFileKey` is left out of every table.

### Code schemes

The files follow the format of the labelling tool:

```json
{
  "SchemeID": "Scheme-gender",
  "Name": "gender",
  "Codes": [
    { "CodeID": "code-female", "StringValue": "female", "CodeType": "Normal" },
    { "CodeID": "code-stop", "StringValue": "STOP", "CodeType": "Control", "ControlCode": "STOP" }
  ]
}
```

### Records

Each line is a JSON object. The consent flag (`consent_withdrawn` by default)
may be a boolean or the strings `"true"` / `"false"`. A single-select coded
field holds an object with a `CodeID`, a multi-select coded field an array of
such objects.

## Outputs

`survey_analysis analyse` writes the following tables to the output directory:

| file | content |
|------|---------|
| `engagement_counts.csv` | messages and participants per episode, and for the season |
| `repeat_participations.csv` | number of individuals per number of episodes they took part in |
| `demographic_distributions.csv` | demographic codes of the individuals who did not opt out |
| `theme_distributions.csv` | every theme of every episode against the survey answers |
| `themes_by_gender.csv` | normal themes broken down by gender |
| `sample_messages.csv` | up to 100 random messages per code |

Cells that cannot be computed are written as `-`: the per-episode totals of
messages and participants (the raw data of closed episodes is overwritten
upstream) and every percentage whose denominator is zero.

The sample of messages changes from one run to the next. Pass
`--sample-seed` to get the same sample for the same inputs.

## Contacts

`survey_analysis location-contacts` and `survey_analysis ad-contacts` write
CSV files with a `URN:Tel` column, ready to be imported in the messaging
platform. The uids are converted to phone numbers with the lookup table
configured in `phoneNumberUuidTable`. Uids missing from the table are counted
and reported, and the export goes on.

*/
